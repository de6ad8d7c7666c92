// crates/crm_config/src/closure_config.rs

//! ClosureConfig - 湍流闭合配置（全 f64）
//!
//! 定义 TKE 闭合的全部可配置项：闭合模式、维度、地表 TKE 启动、
//! 闭合常数、热力学常数、场布局和并行策略。
//! 配置以 JSON 形式读写，加载后必须通过 [`ClosureConfig::validate`]。

use crm_foundation::HaloOffset;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// 湍流闭合配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosureConfig {
    /// 闭合模式
    #[serde(default)]
    pub mode: ClosureMode,

    /// 网格维度（决定调用 3D 还是 2D 剪切产生项）
    #[serde(default)]
    pub dimensionality: Dimensionality,

    /// 首个时间步首个子步时，用地表通量平衡估计地表 TKE；
    /// 同时每步用地表通量驱动最底界面的浮力通量
    #[serde(default)]
    pub enable_surface_tke_bootstrap: bool,

    /// 闭合常数
    #[serde(default)]
    pub coefficients: CoefficientConfig,

    /// 热力学常数
    #[serde(default)]
    pub thermo: ThermoConfig,

    /// 场布局
    #[serde(default)]
    pub layout: LayoutConfig,

    /// 并行配置
    #[serde(default)]
    pub parallel: ParallelConfig,
}

/// 闭合模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClosureMode {
    /// 预报 TKE 方程（显式时间推进）
    #[default]
    Prognostic,
    /// Smagorinsky 诊断闭合，TKE 由涡粘性反算
    Smagorinsky,
}

/// 网格维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Dimensionality {
    /// 三维 CRM
    #[default]
    ThreeD,
    /// 二维 CRM（ny = 1）
    TwoD,
}

/// 闭合常数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoefficientConfig {
    /// 涡粘性系数 Ck
    #[serde(default = "default_ck")]
    pub ck: f64,
    /// Smagorinsky 常数 Cs
    #[serde(default = "default_cs")]
    pub cs: f64,
    /// 湍流 Prandtl 数（扩散系数 = Pr × 涡粘性）
    #[serde(default = "default_prandtl")]
    pub prandtl: f64,
}

fn default_ck() -> f64 { 0.1 }
fn default_cs() -> f64 { 0.15 }
fn default_prandtl() -> f64 { 1.0 }

impl Default for CoefficientConfig {
    fn default() -> Self {
        Self {
            ck: default_ck(),
            cs: default_cs(),
            prandtl: default_prandtl(),
        }
    }
}

/// 热力学常数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermoConfig {
    /// 干空气定压比热 [J/kg/K]
    #[serde(default = "default_cp")]
    pub cp: f64,
    /// 凝结潜热 [J/kg]
    #[serde(default = "default_lcond")]
    pub lcond: f64,
    /// 升华潜热 [J/kg]
    #[serde(default = "default_lsub")]
    pub lsub: f64,
    /// 融化潜热 [J/kg]
    #[serde(default = "default_lfus")]
    pub lfus: f64,
    /// 虚温修正常数 Rv/Rd - 1
    #[serde(default = "default_epsv")]
    pub epsv: f64,
}

fn default_cp() -> f64 { 1004.0 }
fn default_lcond() -> f64 { 2.5104e6 }
fn default_lsub() -> f64 { 2.8440e6 }
fn default_lfus() -> f64 { 0.3336e6 }
fn default_epsv() -> f64 { 0.61 }

impl Default for ThermoConfig {
    fn default() -> Self {
        Self {
            cp: default_cp(),
            lcond: default_lcond(),
            lsub: default_lsub(),
            lfus: default_lfus(),
            epsv: default_epsv(),
        }
    }
}

impl ThermoConfig {
    /// L_c / c_p [K]
    pub fn fac_cond(&self) -> f64 {
        self.lcond / self.cp
    }

    /// L_s / c_p [K]
    pub fn fac_sub(&self) -> f64 {
        self.lsub / self.cp
    }

    /// L_f / c_p [K]
    pub fn fac_fus(&self) -> f64 {
        self.lfus / self.cp
    }
}

/// 场布局：子场编号与水平 halo 偏移
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LayoutConfig {
    /// `tke` 中使用的子场编号
    #[serde(default)]
    pub tke_field: usize,
    /// `tk` 中使用的子场编号
    #[serde(default)]
    pub tk_field: usize,
    /// `tkh` 中使用的子场编号
    #[serde(default)]
    pub tkh_field: usize,
    /// TKE 类（标量）场的 halo 偏移 `offy_s/offx_s`
    #[serde(default)]
    pub scalar_halo: HaloOffset,
    /// 涡粘性/扩散类场的 halo 偏移 `offy_d/offx_d`
    #[serde(default)]
    pub flux_halo: HaloOffset,
}

/// 并行策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParallelStrategy {
    /// 串行执行
    Sequential,
    /// 按垂直层 rayon 并行
    Parallel,
    /// 根据问题规模自动选择
    #[default]
    Auto,
}

/// 并行配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// 并行策略
    #[serde(default)]
    pub strategy: ParallelStrategy,
    /// `Auto` 策略下启用并行的最小网格点数
    #[serde(default = "default_min_parallel_size")]
    pub min_parallel_size: usize,
}

fn default_min_parallel_size() -> usize { 4096 }

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            strategy: ParallelStrategy::default(),
            min_parallel_size: default_min_parallel_size(),
        }
    }
}

impl ParallelConfig {
    /// 给定网格点数时是否走并行路径
    pub fn use_parallel(&self, n_points: usize) -> bool {
        match self.strategy {
            ParallelStrategy::Sequential => false,
            ParallelStrategy::Parallel => true,
            ParallelStrategy::Auto => n_points >= self.min_parallel_size,
        }
    }
}

impl Default for ClosureConfig {
    fn default() -> Self {
        Self {
            mode: ClosureMode::default(),
            dimensionality: Dimensionality::default(),
            enable_surface_tke_bootstrap: false,
            coefficients: CoefficientConfig::default(),
            thermo: ThermoConfig::default(),
            layout: LayoutConfig::default(),
            parallel: ParallelConfig::default(),
        }
    }
}

impl ClosureConfig {
    /// 从 JSON 字符串解析并验证
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: ClosureConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("coefficients.ck", self.coefficients.ck),
            ("coefficients.cs", self.coefficients.cs),
            ("coefficients.prandtl", self.coefficients.prandtl),
            ("thermo.cp", self.thermo.cp),
            ("thermo.lcond", self.thermo.lcond),
            ("thermo.lsub", self.thermo.lsub),
            ("thermo.lfus", self.thermo.lfus),
        ];
        for (key, value) in positive {
            // NaN 也在这里被拒绝
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::invalid(key, value, "必须为有限正数"));
            }
        }

        let epsv = self.thermo.epsv;
        if !(epsv >= 0.0 && epsv.is_finite()) {
            return Err(ConfigError::invalid("thermo.epsv", epsv, "不能为负"));
        }

        Ok(())
    }
}
