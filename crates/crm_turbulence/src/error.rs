// crates/crm_turbulence/src/error.rs

//! 闭合层错误类型
//!
//! 数值核心本身不产生错误；这里只汇总上下文构建与入口形状校验的失败。

use crm_config::ConfigError;
use crm_foundation::CrmError;

/// 闭合错误
#[derive(Debug, thiserror::Error)]
pub enum ClosureError {
    /// 网格/形状错误
    #[error("网格错误: {0}")]
    Grid(#[from] CrmError),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 时间步参数无效
    #[error("无效时间步: {name}={value}")]
    InvalidTimeStep {
        /// 参数名
        name: &'static str,
        /// 参数值
        value: f64,
    },
}

/// 闭合结果类型
pub type ClosureResult<T> = Result<T, ClosureError>;
