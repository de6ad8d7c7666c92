// crates/crm_turbulence/src/lib.rs

//! CRM 亚网格 TKE 湍流闭合
//!
//! 一阶半闭合：由剪切产生、湿亚网格浮力与耗散预报 TKE，
//! 再由 TKE 与稳定性限制的混合长度给出涡粘性与涡扩散。
//!
//! # 模块概览
//!
//! - [`context`]: 网格几何、参考廓线、时间步，组装为 [`ClosureContext`]
//! - [`state`]: 热力学输入、地表通量与原地更新的湍流场
//! - [`staggering`]: halo 索引映射
//! - [`thermo`]: 热力学常数与饱和混合比接口
//! - [`shear`]: 剪切产生项接口
//! - [`boundary`]: 边界界面与地表 TKE 启动
//! - [`buoyancy`]: 界面亚网格浮力通量
//! - [`closure`]: 单元中心闭合更新
//! - [`diagnostics`]: TKE 收支诊断
//! - [`kernel`]: 主入口 [`tke_full`] 与驱动 [`TkeClosure`]
//!
//! # 示例
//!
//! ```
//! use crm_config::ClosureConfig;
//! use crm_turbulence::{
//!     ClosureContext, ClosureDiagnostics, ColumnGeometry, PrescribedDeformation,
//!     ReferenceState, SurfaceFluxes, ThermoState, TimeStep, TkeClosure, TurbulenceFields,
//! };
//!
//! let geometry = ColumnGeometry::uniform(4, 1, 4, 1, 1000.0, 1000.0, 100.0);
//! let reference = ReferenceState::linear(4, 1, 9.81 / 300.0, 1000.0, 10.0);
//! let ctx = ClosureContext::new(&ClosureConfig::default(), geometry, reference, TimeStep::new(10.0)).unwrap();
//!
//! let state = ThermoState::clear_sky(&ctx, &[300.0; 4], &[0.0; 4]).unwrap();
//! let surface = SurfaceFluxes::zeros(&ctx);
//! let shear = PrescribedDeformation::uniform(&ctx, 1e-4);
//! let mut fields = TurbulenceFields::zeros(&ctx).with_uniform_tke(&ctx, 0.1);
//! let mut diagnostics = ClosureDiagnostics::new(&ctx.geometry);
//!
//! let mut closure = TkeClosure::default();
//! closure.step(&ctx, &shear, &state, &surface, &mut fields, &mut diagnostics).unwrap();
//! assert!(fields.tke_at(&ctx, 0, 0, 0, 0) >= 0.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod boundary;
pub mod buoyancy;
pub mod closure;
pub mod constants;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod kernel;
pub mod shear;
pub mod staggering;
pub mod state;
pub mod thermo;

// 重导出常用类型
pub use buoyancy::{interface_flux, InterfaceBuoyancy, InterfaceFlux, InterfaceRegime, LayerSample};
pub use closure::{update_cell, CellInput, CellUpdate};
pub use constants::ClosureCoefficients;
pub use context::{ClosureContext, ColumnGeometry, ReferenceState, TimeStep};
pub use diagnostics::{BudgetAccumulator, BudgetTotals, ClosureDiagnostics};
pub use error::{ClosureError, ClosureResult};
pub use kernel::{run_phases, tke_full, ClosureMetrics, ClosureWorkspace, StepSummary, TkeClosure};
pub use shear::{DeformationSource, PrescribedDeformation};
pub use staggering::StaggeredLayout;
pub use state::{SurfaceFluxes, ThermoState, TurbulenceFields};
pub use thermo::{MagnusSaturation, SaturationMixingRatio, ThermoConstants};
