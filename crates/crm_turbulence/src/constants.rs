// crates/crm_turbulence/src/constants.rs

//! 闭合常数
//!
//! 一阶半（TKE）闭合的经验常数与数值下限。
//!
//! # 耗散系数
//!
//! ```text
//! Ce  = Ck³ / Cs⁴
//! Ce1 = Ce / 0.7 × 0.19
//! Ce2 = Ce / 0.7 × 0.51
//! Cee = Ce1 + Ce2 × (smix / grd)
//! ```

use crm_config::CoefficientConfig;
use serde::{Deserialize, Serialize};

/// 界面浮力产生项中扩散系数的正则化下限 [m²/s]
pub const PRODUCTION_TKH_FLOOR: f64 = 0.002;

/// 剪切产生项中涡粘性的下限 [m²/s]
pub const SHEAR_TK_FLOOR: f64 = 0.001;

/// 由地表浮力通量反推地表浮力时扩散系数的下限 [m²/s]
pub const SURFACE_TKH_FLOOR: f64 = 0.001;

/// 混合长度中 √buoy 的下限
pub const BUOYANCY_FLOOR: f64 = 1.0e-10;

/// 液相比例分母的下限
pub const CONDENSATE_FLOOR: f64 = 1.0e-20;

/// 地表平衡 TKE 中浮力产生项的下限
pub const EQUILIBRIUM_PRODUCTION_FLOOR: f64 = 1.0e-20;

/// 三维稳定性上限系数：`tkmax = 0.09 / (1/cx + 1/cy + 1/cz)`
pub const STABILITY_COEFFICIENT: f64 = 0.09;

/// 耗散率上限 `tke / (4·dt)` 中的步数因子
pub const DISSIPATION_CAP_STEPS: f64 = 4.0;

/// 不稳定层结中混合长度相对网格尺度的下限
pub const MIN_MIXING_LENGTH_RATIO: f64 = 0.1;

/// 稳定性限制混合长度系数
pub const MIXING_LENGTH_COEFFICIENT: f64 = 0.76;

/// 饱和界面浮力中 `T·dqsat/dT` 项的系数（Rv/Rd）
pub const SATURATED_VIRTUAL_COEFFICIENT: f64 = 1.61;

/// 闭合系数（由配置派生）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosureCoefficients {
    /// 涡粘性系数 Ck
    pub ck: f64,
    /// Smagorinsky 常数 Cs
    pub cs: f64,
    /// 湍流 Prandtl 数
    pub pr: f64,
    /// Ce = Ck³ / Cs⁴
    pub ce: f64,
    /// 耗散系数常数部分
    pub ce1: f64,
    /// 耗散系数随混合长度变化部分
    pub ce2: f64,
}

impl ClosureCoefficients {
    /// 由 Ck, Cs, Pr 派生
    pub fn new(ck: f64, cs: f64, pr: f64) -> Self {
        let ce = ck.powi(3) / cs.powi(4);
        Self {
            ck,
            cs,
            pr,
            ce,
            ce1: ce / 0.7 * 0.19,
            ce2: ce / 0.7 * 0.51,
        }
    }

    /// 耗散系数 `Cee = Ce1 + Ce2·ratio`，`ratio = smix/grd`
    #[inline]
    pub fn dissipation(&self, ratio: f64) -> f64 {
        self.ce1 + self.ce2 * ratio
    }
}

impl Default for ClosureCoefficients {
    fn default() -> Self {
        Self::from(&CoefficientConfig::default())
    }
}

impl From<&CoefficientConfig> for ClosureCoefficients {
    fn from(config: &CoefficientConfig) -> Self {
        Self::new(config.ck, config.cs, config.prandtl)
    }
}
