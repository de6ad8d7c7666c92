// crates/crm_turbulence/src/shear.rs

//! 剪切产生项接口
//!
//! 变形率平方 `def2 = 2·S_ij·S_ij` 由动力核心的差分算子给出，
//! 闭合核心只通过 [`DeformationSource`] 取用。

use crate::context::ClosureContext;
use crm_foundation::{CrmError, CrmResult, Field4};

/// 变形率平方来源
///
/// `def2` 形状为 `(nzm, ny, nx, ncrms)`，无 halo。
pub trait DeformationSource: Send + Sync {
    /// 三维网格的剪切产生项
    fn shear_prod_3d(&self, ctx: &ClosureContext, def2: &mut Field4) -> CrmResult<()>;

    /// 二维网格（ny = 1）的剪切产生项
    fn shear_prod_2d(&self, ctx: &ClosureContext, def2: &mut Field4) -> CrmResult<()>;
}

/// 预先给定的变形率场
///
/// 驱动程序或测试直接提供 `def2`，3D/2D 入口行为相同。
#[derive(Debug, Clone, PartialEq)]
pub struct PrescribedDeformation {
    def2: Field4,
}

impl PrescribedDeformation {
    /// 使用给定场
    pub fn new(def2: Field4) -> Self {
        Self { def2 }
    }

    /// 处处相同的变形率平方
    pub fn uniform(ctx: &ClosureContext, value: f64) -> Self {
        let g = &ctx.geometry;
        Self::new(Field4::filled([g.nzm, g.ny, g.nx, g.ncrms], value))
    }

    /// 逐层给定的变形率平方
    pub fn from_levels(ctx: &ClosureContext, levels: &[f64]) -> CrmResult<Self> {
        let g = &ctx.geometry;
        CrmError::check_size("def2 levels", g.nzm, levels.len())?;
        Ok(Self::new(Field4::from_fn([g.nzm, g.ny, g.nx, g.ncrms], |[k, ..]| levels[k])))
    }

    fn copy_into(&self, def2: &mut Field4) -> CrmResult<()> {
        CrmError::check_shape("def2", &self.def2.dims(), &def2.dims())?;
        def2.as_mut_slice().copy_from_slice(self.def2.as_slice());
        Ok(())
    }
}

impl DeformationSource for PrescribedDeformation {
    fn shear_prod_3d(&self, _ctx: &ClosureContext, def2: &mut Field4) -> CrmResult<()> {
        self.copy_into(def2)
    }

    fn shear_prod_2d(&self, _ctx: &ClosureContext, def2: &mut Field4) -> CrmResult<()> {
        self.copy_into(def2)
    }
}
