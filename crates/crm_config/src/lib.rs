// crates/crm_config/src/lib.rs

//! CRM Config Layer
//!
//! 配置层，提供 TKE 闭合的可序列化配置。
//!
//! # 模块概览
//!
//! - [`closure_config`]: ClosureConfig 闭合配置（全 f64，JSON 读写）
//! - [`error`]: 配置错误类型
//!
//! # 层级架构
//!
//! ```text
//! crm_turbulence  ─> ClosureConfig → ClosureContext
//! crm_config      ─> ClosureConfig, ConfigError (本层)
//! crm_foundation  ─> CrmError, Field, HaloOffset
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod closure_config;
pub mod error;

// 重导出核心类型
pub use closure_config::{
    ClosureConfig, ClosureMode, CoefficientConfig, Dimensionality, LayoutConfig, ParallelConfig,
    ParallelStrategy, ThermoConfig,
};
pub use error::ConfigError;
