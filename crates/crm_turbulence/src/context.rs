// crates/crm_turbulence/src/context.rs

//! 闭合上下文
//!
//! 把网格几何、参考廓线、时间步信息、闭合常数与热力学常数收拢为
//! 一个不可变的 [`ClosureContext`]。核心是 `(上下文, 可变状态场)` 的
//! 纯函数，不读取任何全局量。

use crate::constants::ClosureCoefficients;
use crate::error::{ClosureError, ClosureResult};
use crate::staggering::StaggeredLayout;
use crate::thermo::ThermoConstants;
use crm_config::{ClosureConfig, ClosureMode, Dimensionality, ParallelConfig};
use crm_foundation::{CrmError, CrmResult, Profile};
use serde::{Deserialize, Serialize};

/// CRM 柱几何
///
/// 垂直方向按 CRM 实例变化，水平方向统一。
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnGeometry {
    /// 单元中心层数
    pub nzm: usize,
    /// y 方向内部点数
    pub ny: usize,
    /// x 方向内部点数
    pub nx: usize,
    /// CRM 实例数
    pub ncrms: usize,
    /// x 方向网格距 [m]
    pub dx: f64,
    /// y 方向网格距 [m]
    pub dy: f64,
    /// 参考垂直网格距 [m]（每个 CRM）
    pub dz: Vec<f64>,
    /// 单元中心层厚度因子 `(nzm, ncrms)`
    pub adz: Profile,
    /// 界面层厚度因子 `(nzm + 1, ncrms)`
    pub adzw: Profile,
    /// x 方向数值扩散修正因子 `(nzm, ncrms)`
    pub grdf_x: Profile,
    /// y 方向数值扩散修正因子 `(nzm, ncrms)`
    pub grdf_y: Profile,
    /// z 方向数值扩散修正因子 `(nzm, ncrms)`
    pub grdf_z: Profile,
}

impl ColumnGeometry {
    /// 等距网格：层厚度因子与修正因子均为 1
    pub fn uniform(nzm: usize, ny: usize, nx: usize, ncrms: usize, dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            nzm,
            ny,
            nx,
            ncrms,
            dx,
            dy,
            dz: vec![dz; ncrms],
            adz: Profile::filled([nzm, ncrms], 1.0),
            adzw: Profile::filled([nzm + 1, ncrms], 1.0),
            grdf_x: Profile::filled([nzm, ncrms], 1.0),
            grdf_y: Profile::filled([nzm, ncrms], 1.0),
            grdf_z: Profile::filled([nzm, ncrms], 1.0),
        }
    }

    /// 界面层数 `nzm + 1`
    #[inline]
    pub fn nz(&self) -> usize {
        self.nzm + 1
    }

    /// 单元中心网格点总数
    #[inline]
    pub fn n_points(&self) -> usize {
        self.nzm * self.ny * self.nx * self.ncrms
    }

    /// 局地网格尺度 `grd = dz·adz[k]`
    #[inline]
    pub fn grid_scale(&self, k: usize, icrm: usize) -> f64 {
        self.dz[icrm] * self.adz[[k, icrm]]
    }

    /// 界面 `k` 的间距 `dz·adzw[k]`
    #[inline]
    pub fn interface_spacing(&self, k: usize, icrm: usize) -> f64 {
        self.dz[icrm] * self.adzw[[k, icrm]]
    }

    /// 校验维度一致性
    pub fn validate(&self) -> CrmResult<()> {
        if self.nzm < 2 {
            return Err(CrmError::invalid_input(format!(
                "至少需要两个垂直层, nzm = {}",
                self.nzm
            )));
        }
        if self.ny == 0 || self.nx == 0 || self.ncrms == 0 {
            return Err(CrmError::invalid_input("水平网格与 CRM 实例数必须为正"));
        }
        CrmError::check_size("dz", self.ncrms, self.dz.len())?;
        let centers = [self.nzm, self.ncrms];
        CrmError::check_shape("adz", &centers, &self.adz.dims())?;
        CrmError::check_shape("adzw", &[self.nz(), self.ncrms], &self.adzw.dims())?;
        CrmError::check_shape("grdf_x", &centers, &self.grdf_x.dims())?;
        CrmError::check_shape("grdf_y", &centers, &self.grdf_y.dims())?;
        CrmError::check_shape("grdf_z", &centers, &self.grdf_z.dims())?;
        Ok(())
    }
}

/// 参考态廓线
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceState {
    /// 浮力系数 g/θ₀ `(nzm, ncrms)` [m/s²/K]
    pub bet: Profile,
    /// 界面气压 `(nzm + 1, ncrms)` [hPa]
    pub presi: Profile,
}

impl ReferenceState {
    /// 常数浮力系数，界面气压由给定值线性递减
    pub fn linear(nzm: usize, ncrms: usize, bet: f64, p_surface: f64, dp: f64) -> Self {
        Self {
            bet: Profile::filled([nzm, ncrms], bet),
            presi: Profile::from_fn([nzm + 1, ncrms], |[k, _]| p_surface - dp * k as f64),
        }
    }

    /// 校验维度
    pub fn validate(&self, geometry: &ColumnGeometry) -> CrmResult<()> {
        CrmError::check_shape("bet", &[geometry.nzm, geometry.ncrms], &self.bet.dims())?;
        CrmError::check_shape("presi", &[geometry.nz(), geometry.ncrms], &self.presi.dims())?;
        Ok(())
    }
}

/// 时间步信息
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeStep {
    /// 完整时间步 [s]（用于稳定性上限与耗散上限）
    pub dt: f64,
    /// 当前子步长 [s]（用于 TKE 推进）
    pub dtn: f64,
    /// 时间步编号（从 1 开始）
    pub nstep: u64,
    /// 子步编号（从 1 开始）
    pub icycle: u32,
}

impl TimeStep {
    /// 单子步时间步
    pub fn new(dt: f64) -> Self {
        Self {
            dt,
            dtn: dt,
            nstep: 1,
            icycle: 1,
        }
    }

    /// 指定子步长
    pub fn with_substep(mut self, dtn: f64) -> Self {
        self.dtn = dtn;
        self
    }

    /// 指定步号与子步号
    pub fn at(mut self, nstep: u64, icycle: u32) -> Self {
        self.nstep = nstep;
        self.icycle = icycle;
        self
    }

    /// 是否为整个模拟的第一个子步
    #[inline]
    pub fn is_first_substep(&self) -> bool {
        self.nstep == 1 && self.icycle == 1
    }

    fn validate(&self) -> ClosureResult<()> {
        for (name, value) in [("dt", self.dt), ("dtn", self.dtn)] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ClosureError::InvalidTimeStep { name, value });
            }
        }
        Ok(())
    }
}

/// 不可变闭合上下文
#[derive(Debug, Clone)]
pub struct ClosureContext {
    /// 网格几何
    pub geometry: ColumnGeometry,
    /// 参考廓线
    pub reference: ReferenceState,
    /// 时间步
    pub time: TimeStep,
    /// 闭合系数
    pub coefficients: ClosureCoefficients,
    /// 热力学常数
    pub thermo: ThermoConstants,
    /// 闭合模式
    pub mode: ClosureMode,
    /// 网格维度
    pub dimensionality: Dimensionality,
    /// 是否启用地表 TKE 启动与地表通量强迫
    pub surface_bootstrap: bool,
    /// 场布局
    pub layout: StaggeredLayout,
    /// 并行配置
    pub parallel: ParallelConfig,
}

impl ClosureContext {
    /// 由配置、几何、参考态与时间步构建
    pub fn new(
        config: &ClosureConfig,
        geometry: ColumnGeometry,
        reference: ReferenceState,
        time: TimeStep,
    ) -> ClosureResult<Self> {
        config.validate()?;
        geometry.validate()?;
        reference.validate(&geometry)?;
        time.validate()?;
        if config.dimensionality == Dimensionality::TwoD && geometry.ny != 1 {
            return Err(CrmError::invalid_input(format!("2D 模式要求 ny = 1, 实际 {}", geometry.ny)).into());
        }

        let layout = StaggeredLayout::new(&config.layout, geometry.ny, geometry.nx, geometry.ncrms);
        Ok(Self {
            coefficients: ClosureCoefficients::from(&config.coefficients),
            thermo: ThermoConstants::from(&config.thermo),
            mode: config.mode,
            dimensionality: config.dimensionality,
            surface_bootstrap: config.enable_surface_tke_bootstrap,
            parallel: config.parallel,
            layout,
            geometry,
            reference,
            time,
        })
    }

    /// 替换时间步（几何与配置不变）
    pub fn with_time(&self, time: TimeStep) -> ClosureResult<Self> {
        time.validate()?;
        Ok(Self { time, ..self.clone() })
    }

    /// 本次调用是否执行地表 TKE 启动
    #[inline]
    pub fn bootstrap_due(&self) -> bool {
        self.surface_bootstrap && self.time.is_first_substep()
    }

    /// 单元 `(k, icrm)` 的涡粘性/扩散三维稳定性上限
    #[inline]
    pub fn stability_limit(&self, k: usize, icrm: usize) -> f64 {
        let g = &self.geometry;
        let dz_eff = g.dz[icrm] * g.adzw[[k, icrm]].min(g.adzw[[k + 1, icrm]]);
        crate::closure::stability_limit(
            g.dx,
            g.dy,
            dz_eff,
            self.time.dt,
            [g.grdf_x[[k, icrm]], g.grdf_y[[k, icrm]], g.grdf_z[[k, icrm]]],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> (ColumnGeometry, ReferenceState) {
        let g = ColumnGeometry::uniform(4, 2, 3, 2, 1000.0, 1000.0, 100.0);
        let r = ReferenceState::linear(4, 2, 9.81 / 300.0, 1000.0, 10.0);
        (g, r)
    }

    #[test]
    fn test_context_from_default_config() {
        let (g, r) = small();
        let ctx = ClosureContext::new(&ClosureConfig::default(), g, r, TimeStep::new(10.0)).unwrap();
        assert_eq!(ctx.geometry.nz(), 5);
        assert_eq!(ctx.geometry.n_points(), 4 * 2 * 3 * 2);
        assert!(!ctx.bootstrap_due());
        assert!((ctx.geometry.grid_scale(1, 0) - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_bootstrap_only_on_first_substep() {
        let (g, r) = small();
        let mut config = ClosureConfig::default();
        config.enable_surface_tke_bootstrap = true;
        let ctx = ClosureContext::new(&config, g, r, TimeStep::new(10.0)).unwrap();
        assert!(ctx.bootstrap_due());
        assert!(!ctx.with_time(TimeStep::new(10.0).at(1, 2)).unwrap().bootstrap_due());
        assert!(!ctx.with_time(TimeStep::new(10.0).at(2, 1)).unwrap().bootstrap_due());
    }

    #[test]
    fn test_stability_limit_uses_full_step() {
        let (g, r) = small();
        let full = ClosureContext::new(&ClosureConfig::default(), g.clone(), r.clone(), TimeStep::new(10.0)).unwrap();
        let sub = ClosureContext::new(&ClosureConfig::default(), g, r, TimeStep::new(10.0).with_substep(2.5)).unwrap();
        assert_eq!(sub.time.dtn, 2.5);
        assert_eq!(sub.stability_limit(1, 0), full.stability_limit(1, 0));

        let expected = crate::closure::stability_limit(1000.0, 1000.0, 100.0, 10.0, [1.0; 3]);
        assert!((sub.stability_limit(1, 0) - expected).abs() < 1e-12 * expected);
    }

    #[test]
    fn test_rejects_bad_time_step() {
        let (g, r) = small();
        let err = ClosureContext::new(&ClosureConfig::default(), g, r, TimeStep::new(0.0)).unwrap_err();
        assert!(matches!(err, ClosureError::InvalidTimeStep { name: "dt", .. }));
    }

    #[test]
    fn test_rejects_mismatched_profiles() {
        let (g, _) = small();
        let r = ReferenceState::linear(3, 2, 0.03, 1000.0, 10.0);
        let err = ClosureContext::new(&ClosureConfig::default(), g, r, TimeStep::new(1.0)).unwrap_err();
        assert!(matches!(err, ClosureError::Grid(CrmError::ShapeMismatch { name: "bet", .. })));
    }

    #[test]
    fn test_two_d_requires_single_row() {
        let (g, r) = small();
        let mut config = ClosureConfig::default();
        config.dimensionality = Dimensionality::TwoD;
        assert!(ClosureContext::new(&config, g, r, TimeStep::new(1.0)).is_err());
    }

    #[test]
    fn test_stability_limit_uniform() {
        let (g, r) = small();
        let ctx = ClosureContext::new(&ClosureConfig::default(), g, r, TimeStep::new(10.0)).unwrap();
        // cx = cy = 1e5, cz = 1e3
        let expected = 0.09 / (1.0 / 1e5 + 1.0 / 1e5 + 1.0 / 1e3);
        assert!((ctx.stability_limit(0, 0) - expected).abs() < 1e-12);
    }
}
