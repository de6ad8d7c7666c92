// crates/crm_turbulence/src/state.rs

//! 闭合输入/输出状态
//!
//! - [`ThermoState`]: 只读的热力学场（温度、水物质、液冰静力能）
//! - [`SurfaceFluxes`]: 只读的地表通量
//! - [`TurbulenceFields`]: 原地更新的 `tke`, `tk`, `tkh`
//!
//! 所有形状在进入任何计算阶段之前统一校验，校验失败时状态不被修改。

use crate::context::ClosureContext;
use crm_foundation::{CrmError, CrmResult, Field4, Field5, Surface};

/// 热力学状态（单元中心，无 halo，`t` 除外）
#[derive(Debug, Clone, PartialEq)]
pub struct ThermoState {
    /// 绝对温度 [K]
    pub tabs: Field4,
    /// 水汽混合比 [kg/kg]
    pub qv: Field4,
    /// 云水混合比 [kg/kg]
    pub qcl: Field4,
    /// 云冰混合比 [kg/kg]
    pub qci: Field4,
    /// 液态降水混合比 [kg/kg]
    pub qpl: Field4,
    /// 固态降水混合比 [kg/kg]
    pub qpi: Field4,
    /// 液冰静力能 / cp [K]（带标量 halo）
    pub t: Field4,
}

impl ThermoState {
    /// 无凝结物的水平均匀状态：`t` 与 `tabs` 取相同廓线
    pub fn clear_sky(ctx: &ClosureContext, tabs: &[f64], qv: &[f64]) -> CrmResult<Self> {
        let g = &ctx.geometry;
        CrmError::check_size("tabs levels", g.nzm, tabs.len())?;
        CrmError::check_size("qv levels", g.nzm, qv.len())?;
        let dims = [g.nzm, g.ny, g.nx, g.ncrms];
        Ok(Self {
            tabs: Field4::from_fn(dims, |[k, ..]| tabs[k]),
            qv: Field4::from_fn(dims, |[k, ..]| qv[k]),
            qcl: Field4::zeros(dims),
            qci: Field4::zeros(dims),
            qpl: Field4::zeros(dims),
            qpi: Field4::zeros(dims),
            t: Field4::from_fn(ctx.layout.scalar_dims4(g.nzm), |[k, ..]| tabs[k]),
        })
    }

    /// 校验全部场的形状
    pub fn validate(&self, ctx: &ClosureContext) -> CrmResult<()> {
        let g = &ctx.geometry;
        let dims = [g.nzm, g.ny, g.nx, g.ncrms];
        for (name, field) in [
            ("tabs", &self.tabs),
            ("qv", &self.qv),
            ("qcl", &self.qcl),
            ("qci", &self.qci),
            ("qpl", &self.qpl),
            ("qpi", &self.qpi),
        ] {
            CrmError::check_shape(name, &dims, &field.dims())?;
        }
        CrmError::check_shape("t", &ctx.layout.scalar_dims4(g.nzm), &self.t.dims())
    }
}

/// 地表通量
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceFluxes {
    /// 地表位温通量 [K m/s]
    pub fluxbt: Surface,
    /// 地表水汽通量 [kg/kg m/s]
    pub fluxbq: Surface,
    /// 地表温度 [K]
    pub tsfc: Surface,
}

impl SurfaceFluxes {
    /// 零通量
    pub fn zeros(ctx: &ClosureContext) -> Self {
        Self::uniform(ctx, 0.0, 0.0, 0.0)
    }

    /// 水平均匀通量
    pub fn uniform(ctx: &ClosureContext, fluxbt: f64, fluxbq: f64, tsfc: f64) -> Self {
        let g = &ctx.geometry;
        let dims = [g.ny, g.nx, g.ncrms];
        Self {
            fluxbt: Surface::filled(dims, fluxbt),
            fluxbq: Surface::filled(dims, fluxbq),
            tsfc: Surface::filled(dims, tsfc),
        }
    }

    /// 校验形状
    pub fn validate(&self, ctx: &ClosureContext) -> CrmResult<()> {
        let g = &ctx.geometry;
        let dims = [g.ny, g.nx, g.ncrms];
        CrmError::check_shape("fluxbt", &dims, &self.fluxbt.dims())?;
        CrmError::check_shape("fluxbq", &dims, &self.fluxbq.dims())?;
        CrmError::check_shape("tsfc", &dims, &self.tsfc.dims())
    }
}

/// 原地更新的湍流场
///
/// 三个数组都带子场维度；实际使用的子场由布局配置决定。
#[derive(Debug, Clone, PartialEq)]
pub struct TurbulenceFields {
    /// 亚网格湍动能 [m²/s²]（标量 halo）
    pub tke: Field5,
    /// 涡粘性 [m²/s]（通量 halo）
    pub tk: Field5,
    /// 涡扩散 [m²/s]（通量 halo）
    pub tkh: Field5,
}

impl TurbulenceFields {
    /// 按布局创建零场，子场数刚好容纳配置的编号
    pub fn zeros(ctx: &ClosureContext) -> Self {
        let l = &ctx.layout;
        let nzm = ctx.geometry.nzm;
        Self {
            tke: Field5::zeros(l.scalar_dims(l.tke_field + 1, nzm)),
            tk: Field5::zeros(l.flux_dims(l.tk_field + 1, nzm)),
            tkh: Field5::zeros(l.flux_dims(l.tkh_field + 1, nzm)),
        }
    }

    /// 把所有内部点的 TKE 设为 `tke`，`tk`/`tkh` 与之保持闭合关系
    pub fn with_uniform_tke(mut self, ctx: &ClosureContext, tke: f64) -> Self {
        let l = ctx.layout;
        let g = &ctx.geometry;
        let c = &ctx.coefficients;
        for k in 0..g.nzm {
            for j in 0..g.ny {
                for i in 0..g.nx {
                    for icrm in 0..g.ncrms {
                        let tk = c.ck * g.grid_scale(k, icrm) * tke.sqrt();
                        self.tke[l.to_tke_index(k, j, i, icrm)] = tke;
                        self.tk[l.tk_index(k, j, i, icrm)] = tk;
                        self.tkh[l.tkh_index(k, j, i, icrm)] = c.pr * tk;
                    }
                }
            }
        }
        self
    }

    /// 内部点 TKE
    #[inline]
    pub fn tke_at(&self, ctx: &ClosureContext, k: usize, j: usize, i: usize, icrm: usize) -> f64 {
        self.tke[ctx.layout.to_tke_index(k, j, i, icrm)]
    }

    /// 内部点涡粘性
    #[inline]
    pub fn tk_at(&self, ctx: &ClosureContext, k: usize, j: usize, i: usize, icrm: usize) -> f64 {
        self.tk[ctx.layout.tk_index(k, j, i, icrm)]
    }

    /// 内部点涡扩散
    #[inline]
    pub fn tkh_at(&self, ctx: &ClosureContext, k: usize, j: usize, i: usize, icrm: usize) -> f64 {
        self.tkh[ctx.layout.tkh_index(k, j, i, icrm)]
    }

    /// 校验形状与子场编号
    pub fn validate(&self, ctx: &ClosureContext) -> CrmResult<()> {
        let l = &ctx.layout;
        let nzm = ctx.geometry.nzm;
        check_field5("tke", &self.tke, l.tke_field, &l.scalar_dims(1, nzm))?;
        check_field5("tk", &self.tk, l.tk_field, &l.flux_dims(1, nzm))?;
        check_field5("tkh", &self.tkh, l.tkh_field, &l.flux_dims(1, nzm))
    }
}

fn check_field5(name: &'static str, field: &Field5, index: usize, expected: &[usize; 5]) -> CrmResult<()> {
    let dims = field.dims();
    CrmError::check_shape(name, &expected[1..], &dims[1..])?;
    CrmError::check_index(name, index, dims[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ColumnGeometry, ReferenceState, TimeStep};
    use crm_config::ClosureConfig;
    use crm_foundation::HaloOffset;

    fn ctx() -> ClosureContext {
        let mut config = ClosureConfig::default();
        config.layout.tk_field = 1;
        config.layout.scalar_halo = HaloOffset::new(1, 1);
        config.layout.flux_halo = HaloOffset::new(0, 1);
        ClosureContext::new(
            &config,
            ColumnGeometry::uniform(3, 2, 2, 1, 500.0, 500.0, 50.0),
            ReferenceState::linear(3, 1, 0.033, 1000.0, 5.0),
            TimeStep::new(5.0),
        )
        .unwrap()
    }

    #[test]
    fn test_zeros_match_layout() {
        let ctx = ctx();
        let fields = TurbulenceFields::zeros(&ctx);
        assert_eq!(fields.tke.dims(), [1, 3, 4, 4, 1]);
        assert_eq!(fields.tk.dims(), [2, 3, 2, 4, 1]);
        assert_eq!(fields.tkh.dims(), [1, 3, 2, 4, 1]);
        assert!(fields.validate(&ctx).is_ok());
    }

    #[test]
    fn test_uniform_tke_writes_interior_only() {
        let ctx = ctx();
        let fields = TurbulenceFields::zeros(&ctx).with_uniform_tke(&ctx, 0.25);
        assert_eq!(fields.tke_at(&ctx, 2, 1, 1, 0), 0.25);
        // halo 单元保持为零
        assert_eq!(fields.tke[[0, 0, 0, 0, 0]], 0.0);
        let expected_tk = 0.1 * 50.0 * 0.5;
        assert!((fields.tk_at(&ctx, 0, 0, 0, 0) - expected_tk).abs() < 1e-12);
        assert!((fields.tkh_at(&ctx, 0, 0, 0, 0) - expected_tk).abs() < 1e-12);
    }

    #[test]
    fn test_missing_subfield_rejected() {
        let ctx = ctx();
        let mut fields = TurbulenceFields::zeros(&ctx);
        fields.tk = Field5::zeros(ctx.layout.flux_dims(1, 3));
        assert!(matches!(
            fields.validate(&ctx),
            Err(CrmError::IndexOutOfBounds { index_type: "tk", .. })
        ));
    }

    #[test]
    fn test_thermo_shape_check() {
        let ctx = ctx();
        let mut thermo = ThermoState::clear_sky(&ctx, &[300.0, 299.0, 298.0], &[0.01; 3]).unwrap();
        assert!(thermo.validate(&ctx).is_ok());
        assert_eq!(thermo.t.dims(), [3, 4, 4, 1]);
        thermo.t = Field4::zeros([3, 2, 2, 1]);
        assert!(matches!(thermo.validate(&ctx), Err(CrmError::ShapeMismatch { name: "t", .. })));
    }

    #[test]
    fn test_surface_shape_check() {
        let ctx = ctx();
        let mut surface = SurfaceFluxes::uniform(&ctx, 0.1, 1e-5, 300.0);
        assert!(surface.validate(&ctx).is_ok());
        surface.tsfc = Surface::zeros([1, 1, 1]);
        assert!(surface.validate(&ctx).is_err());
    }
}
