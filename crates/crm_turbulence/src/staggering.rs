// crates/crm_turbulence/src/staggering.rs

//! 水平交错/halo 索引映射
//!
//! 动力核心持有的场带有 halo：
//!
//! - TKE 类（标量）场 `tke`, `t` 使用 `offy_s/offx_s`
//! - 涡粘性/扩散类场 `tk`, `tkh` 使用 `offy_d/offx_d`
//!
//! 闭合核心只用内部索引 `(k, j, i, icrm)` 思考，由本模块的
//! [`StaggeredLayout::to_tke_index`] 与 [`StaggeredLayout::to_flux_index`]
//! 转换成存储索引。按层并行时使用 `*_plane_offset` 得到层平面内的偏移。

use crm_config::LayoutConfig;
use crm_foundation::HaloOffset;

/// 场布局与 halo 映射
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaggeredLayout {
    /// `tke` 子场编号
    pub tke_field: usize,
    /// `tk` 子场编号
    pub tk_field: usize,
    /// `tkh` 子场编号
    pub tkh_field: usize,
    /// 标量场 halo
    pub scalar_halo: HaloOffset,
    /// 涡粘性/扩散场 halo
    pub flux_halo: HaloOffset,
    ny: usize,
    nx: usize,
    ncrms: usize,
}

impl StaggeredLayout {
    /// 由布局配置与内部水平范围创建
    pub fn new(config: &LayoutConfig, ny: usize, nx: usize, ncrms: usize) -> Self {
        Self {
            tke_field: config.tke_field,
            tk_field: config.tk_field,
            tkh_field: config.tkh_field,
            scalar_halo: config.scalar_halo,
            flux_halo: config.flux_halo,
            ny,
            nx,
            ncrms,
        }
    }

    /// 内部点 → `tke[field, k, j+offy_s, i+offx_s, icrm]`
    #[inline]
    pub fn to_tke_index(&self, k: usize, j: usize, i: usize, icrm: usize) -> [usize; 5] {
        let (jj, ii) = self.scalar_halo.apply(j, i);
        [self.tke_field, k, jj, ii, icrm]
    }

    /// 内部点 → `tk/tkh[field, k, j+offy_d, i+offx_d, icrm]`
    #[inline]
    pub fn to_flux_index(&self, field: usize, k: usize, j: usize, i: usize, icrm: usize) -> [usize; 5] {
        let (jj, ii) = self.flux_halo.apply(j, i);
        [field, k, jj, ii, icrm]
    }

    /// 涡粘性存储索引
    #[inline]
    pub fn tk_index(&self, k: usize, j: usize, i: usize, icrm: usize) -> [usize; 5] {
        self.to_flux_index(self.tk_field, k, j, i, icrm)
    }

    /// 涡扩散存储索引
    #[inline]
    pub fn tkh_index(&self, k: usize, j: usize, i: usize, icrm: usize) -> [usize; 5] {
        self.to_flux_index(self.tkh_field, k, j, i, icrm)
    }

    /// 带标量 halo 的四维场（如液冰静力能 `t`）索引
    #[inline]
    pub fn scalar_index(&self, k: usize, j: usize, i: usize, icrm: usize) -> [usize; 4] {
        let (jj, ii) = self.scalar_halo.apply(j, i);
        [k, jj, ii, icrm]
    }

    /// 标量场层平面内的线性偏移
    #[inline]
    pub fn scalar_plane_offset(&self, j: usize, i: usize, icrm: usize) -> usize {
        Self::plane_offset(self.scalar_halo, self.nx, self.ncrms, j, i, icrm)
    }

    /// 涡粘性/扩散场层平面内的线性偏移
    #[inline]
    pub fn flux_plane_offset(&self, j: usize, i: usize, icrm: usize) -> usize {
        Self::plane_offset(self.flux_halo, self.nx, self.ncrms, j, i, icrm)
    }

    /// 无 halo 场层平面内的线性偏移
    #[inline]
    pub fn interior_plane_offset(&self, j: usize, i: usize, icrm: usize) -> usize {
        (j * self.nx + i) * self.ncrms + icrm
    }

    #[inline]
    fn plane_offset(halo: HaloOffset, nx: usize, ncrms: usize, j: usize, i: usize, icrm: usize) -> usize {
        let (jj, ii) = halo.apply(j, i);
        let nxh = nx + 2 * halo.x;
        (jj * nxh + ii) * ncrms + icrm
    }

    /// 标量（TKE 类）五维场的维度
    pub fn scalar_dims(&self, n_fields: usize, nzm: usize) -> [usize; 5] {
        let (nyh, nxh) = self.scalar_halo.padded_extent(self.ny, self.nx);
        [n_fields, nzm, nyh, nxh, self.ncrms]
    }

    /// 涡粘性/扩散五维场的维度
    pub fn flux_dims(&self, n_fields: usize, nzm: usize) -> [usize; 5] {
        let (nyh, nxh) = self.flux_halo.padded_extent(self.ny, self.nx);
        [n_fields, nzm, nyh, nxh, self.ncrms]
    }

    /// 带标量 halo 的四维场维度
    pub fn scalar_dims4(&self, nzm: usize) -> [usize; 4] {
        let (nyh, nxh) = self.scalar_halo.padded_extent(self.ny, self.nx);
        [nzm, nyh, nxh, self.ncrms]
    }

    /// 标量场单层平面大小
    pub fn scalar_plane_len(&self) -> usize {
        let (nyh, nxh) = self.scalar_halo.padded_extent(self.ny, self.nx);
        nyh * nxh * self.ncrms
    }

    /// 涡粘性/扩散场单层平面大小
    pub fn flux_plane_len(&self) -> usize {
        let (nyh, nxh) = self.flux_halo.padded_extent(self.ny, self.nx);
        nyh * nxh * self.ncrms
    }

    /// 无 halo 单层平面大小
    pub fn interior_plane_len(&self) -> usize {
        self.ny * self.nx * self.ncrms
    }
}
