// crates/crm_turbulence/src/kernel.rs

//! TKE 闭合主入口
//!
//! 一次调用按顺序执行四个阶段，阶段之间是完整屏障：
//!
//! 1. 剪切产生项 `def2`（外部 [`DeformationSource`]）
//! 2. 边界界面清零、可选的地表启动与地表通量强迫，然后计算内部界面浮力
//! 3. 逐层闭合更新 `tke`, `tk`, `tkh`
//! 4. 收支诊断写出
//!
//! 所有输入形状在阶段 1 之前校验，失败时状态不变。
//!
//! [`tke_full`] 每次分配工作数组；[`TkeClosure`] 复用工作数组并记录性能指标。

use crate::boundary::{apply_surface_flux_forcing, bootstrap_surface_tke, zero_boundary_interfaces};
use crate::buoyancy::{compute_interface_fluxes, InterfaceBuoyancy};
use crate::closure::update_levels;
use crate::context::{ClosureContext, ColumnGeometry};
use crate::diagnostics::{BudgetAccumulator, ClosureDiagnostics};
use crate::error::ClosureResult;
use crate::shear::DeformationSource;
use crate::state::{SurfaceFluxes, ThermoState, TurbulenceFields};
use crate::thermo::{MagnusSaturation, SaturationMixingRatio};
use crm_config::Dimensionality;
use crm_foundation::Field4;
use std::time::{Duration, Instant};

/// 单次调用摘要
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSummary {
    /// 使用饱和关系的界面点数
    pub cloudy_interfaces: usize,
    /// 地表启动抬高 TKE 的点数（未启动时为 0）
    pub bootstrapped_points: usize,
    /// 是否走并行路径
    pub parallel: bool,
    /// 耗时
    pub duration: Duration,
}

/// 调用之间复用的工作数组
pub struct ClosureWorkspace {
    def2: Field4,
    buoyancy: InterfaceBuoyancy,
    budget: BudgetAccumulator,
}

impl ClosureWorkspace {
    /// 按几何分配
    pub fn new(geometry: &ColumnGeometry) -> Self {
        Self {
            def2: Field4::zeros([geometry.nzm, geometry.ny, geometry.nx, geometry.ncrms]),
            buoyancy: InterfaceBuoyancy::new(geometry),
            budget: BudgetAccumulator::new(geometry),
        }
    }

    /// 是否适用于给定几何
    pub fn fits(&self, geometry: &ColumnGeometry) -> bool {
        self.def2.dims() == [geometry.nzm, geometry.ny, geometry.nx, geometry.ncrms]
    }

    /// 最近一次调用的变形率平方
    pub fn def2(&self) -> &Field4 {
        &self.def2
    }

    /// 最近一次调用的界面浮力
    pub fn interface_buoyancy(&self) -> &InterfaceBuoyancy {
        &self.buoyancy
    }
}

/// 执行一次完整闭合（分配临时工作数组）
pub fn tke_full<D, S>(
    ctx: &ClosureContext,
    deformation: &D,
    saturation: &S,
    state: &ThermoState,
    surface: &SurfaceFluxes,
    fields: &mut TurbulenceFields,
    diagnostics: &mut ClosureDiagnostics,
) -> ClosureResult<StepSummary>
where
    D: DeformationSource + ?Sized,
    S: SaturationMixingRatio + ?Sized,
{
    let mut workspace = ClosureWorkspace::new(&ctx.geometry);
    run_phases(ctx, deformation, saturation, state, surface, fields, diagnostics, &mut workspace)
}

/// 在给定工作数组上执行四个阶段
#[allow(clippy::too_many_arguments)]
pub fn run_phases<D, S>(
    ctx: &ClosureContext,
    deformation: &D,
    saturation: &S,
    state: &ThermoState,
    surface: &SurfaceFluxes,
    fields: &mut TurbulenceFields,
    diagnostics: &mut ClosureDiagnostics,
    workspace: &mut ClosureWorkspace,
) -> ClosureResult<StepSummary>
where
    D: DeformationSource + ?Sized,
    S: SaturationMixingRatio + ?Sized,
{
    let start = Instant::now();
    let g = &ctx.geometry;

    state.validate(ctx)?;
    surface.validate(ctx)?;
    fields.validate(ctx)?;
    diagnostics.validate(g)?;
    if !workspace.fits(g) {
        *workspace = ClosureWorkspace::new(g);
    }

    let n_points = g.n_points();
    let parallel = ctx.parallel.use_parallel(n_points);
    log::debug!(
        "tke_full: nzm={} ny={} nx={} ncrms={} mode={:?} parallel={}",
        g.nzm,
        g.ny,
        g.nx,
        g.ncrms,
        ctx.mode,
        parallel
    );

    // 阶段 1
    match ctx.dimensionality {
        Dimensionality::ThreeD => deformation.shear_prod_3d(ctx, &mut workspace.def2)?,
        Dimensionality::TwoD => deformation.shear_prod_2d(ctx, &mut workspace.def2)?,
    }

    // 阶段 2
    zero_boundary_interfaces(&mut workspace.buoyancy, g.nzm);
    let mut bootstrapped_points = 0;
    if ctx.bootstrap_due() {
        bootstrapped_points = bootstrap_surface_tke(ctx, state, surface, fields, &mut workspace.buoyancy);
        log::info!(
            "地表 TKE 启动: {} / {} 个地表点由平衡值抬高",
            bootstrapped_points,
            g.ny * g.nx * g.ncrms
        );
    }
    if ctx.surface_bootstrap {
        apply_surface_flux_forcing(ctx, state, surface, fields, &mut workspace.buoyancy);
    }
    let cloudy_interfaces = compute_interface_fluxes(ctx, state, fields, saturation, &mut workspace.buoyancy, parallel);
    log::trace!("云内界面点数: {}", cloudy_interfaces);

    // 阶段 3
    workspace.budget.reset();
    update_levels(ctx, &workspace.def2, &workspace.buoyancy, fields, &workspace.budget, parallel);

    // 阶段 4
    workspace.budget.collect_into(diagnostics);
    let totals = workspace.budget.totals();
    log::trace!(
        "TKE 收支: shear={:.6e} buoy={:.6e} diss={:.6e} lediss={:.6e}",
        totals.shear,
        totals.buoy,
        totals.diss,
        totals.lediss
    );

    Ok(StepSummary {
        cloudy_interfaces,
        bootstrapped_points,
        parallel,
        duration: start.elapsed(),
    })
}

/// 闭合性能指标
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClosureMetrics {
    /// 总调用次数
    pub total_calls: usize,
    /// 并行调用次数
    pub parallel_calls: usize,
    /// 串行调用次数
    pub sequential_calls: usize,
    /// 总耗时
    pub total_duration: Duration,
    /// 累计云内界面点数
    pub cloudy_interfaces: usize,
    /// 地表启动次数
    pub bootstraps: usize,
}

impl ClosureMetrics {
    /// 记录一次调用
    pub fn record(&mut self, summary: &StepSummary, bootstrapped: bool) {
        self.total_calls += 1;
        self.total_duration += summary.duration;
        self.cloudy_interfaces += summary.cloudy_interfaces;
        if summary.parallel {
            self.parallel_calls += 1;
        } else {
            self.sequential_calls += 1;
        }
        if bootstrapped {
            self.bootstraps += 1;
        }
    }

    /// 重置指标
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// 平均每次调用耗时
    pub fn avg_time_per_call(&self) -> Duration {
        if self.total_calls > 0 {
            self.total_duration.div_f64(self.total_calls as f64)
        } else {
            Duration::ZERO
        }
    }
}

/// 可复用的 TKE 闭合驱动
///
/// 持有饱和混合比实现、工作数组与性能指标。
pub struct TkeClosure {
    saturation: Box<dyn SaturationMixingRatio>,
    workspace: Option<ClosureWorkspace>,
    metrics: ClosureMetrics,
}

impl Default for TkeClosure {
    fn default() -> Self {
        Self::new(MagnusSaturation::default())
    }
}

impl TkeClosure {
    /// 使用指定饱和混合比实现
    pub fn new(saturation: impl SaturationMixingRatio + 'static) -> Self {
        Self {
            saturation: Box::new(saturation),
            workspace: None,
            metrics: ClosureMetrics::default(),
        }
    }

    /// 推进一个（子）时间步
    pub fn step(
        &mut self,
        ctx: &ClosureContext,
        deformation: &dyn DeformationSource,
        state: &ThermoState,
        surface: &SurfaceFluxes,
        fields: &mut TurbulenceFields,
        diagnostics: &mut ClosureDiagnostics,
    ) -> ClosureResult<StepSummary> {
        let workspace = self
            .workspace
            .get_or_insert_with(|| ClosureWorkspace::new(&ctx.geometry));
        let summary = run_phases(
            ctx,
            deformation,
            self.saturation.as_ref(),
            state,
            surface,
            fields,
            diagnostics,
            workspace,
        )?;
        self.metrics.record(&summary, ctx.bootstrap_due());
        Ok(summary)
    }

    /// 最近一次调用的工作数组
    pub fn workspace(&self) -> Option<&ClosureWorkspace> {
        self.workspace.as_ref()
    }

    /// 性能指标
    pub fn metrics(&self) -> &ClosureMetrics {
        &self.metrics
    }

    /// 重置性能指标
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_record() {
        let mut metrics = ClosureMetrics::default();
        let summary = |parallel| StepSummary {
            cloudy_interfaces: 3,
            bootstrapped_points: 0,
            parallel,
            duration: Duration::from_millis(10),
        };
        metrics.record(&summary(true), true);
        metrics.record(&summary(false), false);
        assert_eq!(metrics.total_calls, 2);
        assert_eq!(metrics.parallel_calls, 1);
        assert_eq!(metrics.sequential_calls, 1);
        assert_eq!(metrics.cloudy_interfaces, 6);
        assert_eq!(metrics.bootstraps, 1);
        assert_eq!(metrics.avg_time_per_call(), Duration::from_millis(10));

        metrics.reset();
        assert_eq!(metrics.total_calls, 0);
        assert_eq!(metrics.avg_time_per_call(), Duration::ZERO);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_avg_time_beyond_u32_calls() {
        let calls = u32::MAX as usize + 2;
        let metrics = ClosureMetrics {
            total_calls: calls,
            sequential_calls: calls,
            total_duration: Duration::from_secs(calls as u64),
            ..Default::default()
        };
        assert_eq!(metrics.avg_time_per_call(), Duration::from_secs(1));
    }

    #[test]
    fn test_workspace_fits() {
        let g = ColumnGeometry::uniform(3, 1, 2, 1, 100.0, 100.0, 10.0);
        let ws = ClosureWorkspace::new(&g);
        assert!(ws.fits(&g));
        let other = ColumnGeometry::uniform(4, 1, 2, 1, 100.0, 100.0, 10.0);
        assert!(!ws.fits(&other));
        assert_eq!(ws.interface_buoyancy().buoy_sgs_vert.dims(), [4, 1, 2, 1]);
    }
}
