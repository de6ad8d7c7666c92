// crates/crm_turbulence/src/thermo.rs

//! 热力学常数与饱和混合比
//!
//! 闭合核心只需要四个纯函数：液面/冰面饱和混合比及其温度导数。
//! 它们通过 [`SaturationMixingRatio`] trait 注入，外部模式可以替换为
//! 自己的拟合公式。
//!
//! # Magnus 参考实现
//!
//! ```text
//! e_s(T) = 6.108 hPa × exp(a·Tc / (Tc + b))
//! q_s    = 0.622 × e_s / max(e_s, p − e_s)
//! ```
//!
//! 液面 `a = 17.27, b = 237.3`，冰面 `a = 21.875, b = 265.5`，Tc 为摄氏温度。

use crm_config::ThermoConfig;

/// 0 °C 对应的开尔文温度
pub const FREEZING_POINT: f64 = 273.15;

/// 水汽与干空气分子量之比 Rd/Rv
pub const EPSILON_MW: f64 = 0.622;

/// 闭合使用的热力学常数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermoConstants {
    /// 虚温修正常数
    pub epsv: f64,
    /// L_c / c_p [K]
    pub fac_cond: f64,
    /// L_s / c_p [K]
    pub fac_sub: f64,
    /// L_f / c_p [K]
    pub fac_fus: f64,
}

impl From<&ThermoConfig> for ThermoConstants {
    fn from(config: &ThermoConfig) -> Self {
        Self {
            epsv: config.epsv,
            fac_cond: config.fac_cond(),
            fac_sub: config.fac_sub(),
            fac_fus: config.fac_fus(),
        }
    }
}

impl Default for ThermoConstants {
    fn default() -> Self {
        Self::from(&ThermoConfig::default())
    }
}

/// 饱和混合比接口
///
/// 温度单位 K，气压单位 hPa，返回 kg/kg（导数为 kg/kg/K）。
pub trait SaturationMixingRatio: Send + Sync {
    /// 液面饱和混合比
    fn qsatw(&self, temperature: f64, pressure: f64) -> f64;

    /// 冰面饱和混合比
    fn qsati(&self, temperature: f64, pressure: f64) -> f64;

    /// 液面饱和混合比的温度导数
    fn dtqsatw(&self, temperature: f64, pressure: f64) -> f64;

    /// 冰面饱和混合比的温度导数
    fn dtqsati(&self, temperature: f64, pressure: f64) -> f64;

    /// 按液相比例 `omn` 混合的饱和混合比
    #[inline]
    fn qsat_blend(&self, temperature: f64, pressure: f64, omn: f64) -> f64 {
        omn * self.qsatw(temperature, pressure) + (1.0 - omn) * self.qsati(temperature, pressure)
    }

    /// 按液相比例 `omn` 混合的饱和混合比温度导数
    #[inline]
    fn dtqsat_blend(&self, temperature: f64, pressure: f64, omn: f64) -> f64 {
        omn * self.dtqsatw(temperature, pressure) + (1.0 - omn) * self.dtqsati(temperature, pressure)
    }
}

/// Magnus 公式饱和混合比
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnusSaturation {
    /// 0 °C 饱和水汽压 [hPa]
    pub e0: f64,
    /// 液面系数 (a, b)
    pub water: (f64, f64),
    /// 冰面系数 (a, b)
    pub ice: (f64, f64),
}

impl Default for MagnusSaturation {
    fn default() -> Self {
        Self {
            e0: 6.108,
            water: (17.27, 237.3),
            ice: (21.875, 265.5),
        }
    }
}

impl MagnusSaturation {
    /// 饱和水汽压 [hPa] 及其温度导数
    #[inline]
    fn vapor_pressure(&self, temperature: f64, (a, b): (f64, f64)) -> (f64, f64) {
        let tc = temperature - FREEZING_POINT;
        let es = self.e0 * (a * tc / (tc + b)).exp();
        let des = es * a * b / ((tc + b) * (tc + b));
        (es, des)
    }

    #[inline]
    fn mixing_ratio(&self, temperature: f64, pressure: f64, coeffs: (f64, f64)) -> f64 {
        let (es, _) = self.vapor_pressure(temperature, coeffs);
        EPSILON_MW * es / es.max(pressure - es)
    }

    #[inline]
    fn mixing_ratio_derivative(&self, temperature: f64, pressure: f64, coeffs: (f64, f64)) -> f64 {
        let (es, des) = self.vapor_pressure(temperature, coeffs);
        let pd = pressure - es;
        if pd > es {
            EPSILON_MW * pressure * des / (pd * pd)
        } else {
            // 分母被截断为 es 时 q_s 恒为 0.622
            0.0
        }
    }
}

impl SaturationMixingRatio for MagnusSaturation {
    fn qsatw(&self, temperature: f64, pressure: f64) -> f64 {
        self.mixing_ratio(temperature, pressure, self.water)
    }

    fn qsati(&self, temperature: f64, pressure: f64) -> f64 {
        self.mixing_ratio(temperature, pressure, self.ice)
    }

    fn dtqsatw(&self, temperature: f64, pressure: f64) -> f64 {
        self.mixing_ratio_derivative(temperature, pressure, self.water)
    }

    fn dtqsati(&self, temperature: f64, pressure: f64) -> f64 {
        self.mixing_ratio_derivative(temperature, pressure, self.ice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vapor_pressure_at_freezing() {
        let sat = MagnusSaturation::default();
        assert!((sat.vapor_pressure(FREEZING_POINT, sat.water).0 - 6.108).abs() < 1e-12);
        assert!((sat.vapor_pressure(FREEZING_POINT, sat.ice).0 - 6.108).abs() < 1e-12);
    }

    #[test]
    fn test_ice_saturation_below_water_when_cold() {
        let sat = MagnusSaturation::default();
        let t = 253.15;
        assert!(sat.qsati(t, 800.0) < sat.qsatw(t, 800.0));
    }

    #[test]
    fn test_typical_surface_value() {
        // 20 °C, 1000 hPa: q_s ≈ 14.7 g/kg
        let sat = MagnusSaturation::default();
        let qs = sat.qsatw(293.15, 1000.0);
        assert!(qs > 0.014 && qs < 0.0155, "qs = {}", qs);
    }

    #[test]
    fn test_derivative_matches_finite_difference() {
        let sat = MagnusSaturation::default();
        let p = 850.0;
        let h = 1e-4;
        for &t in &[250.0, 273.15, 290.0, 300.0] {
            let fd_w = (sat.qsatw(t + h, p) - sat.qsatw(t - h, p)) / (2.0 * h);
            let fd_i = (sat.qsati(t + h, p) - sat.qsati(t - h, p)) / (2.0 * h);
            assert!((sat.dtqsatw(t, p) - fd_w).abs() < 1e-8 * fd_w.abs().max(1.0));
            assert!((sat.dtqsati(t, p) - fd_i).abs() < 1e-8 * fd_i.abs().max(1.0));
        }
    }

    #[test]
    fn test_low_pressure_clamp() {
        let sat = MagnusSaturation::default();
        // p - e_s < e_s 时 q_s 截断为 0.622 且导数为 0
        let t = 330.0;
        let p = 50.0;
        assert!((sat.qsatw(t, p) - EPSILON_MW).abs() < 1e-12);
        assert_eq!(sat.dtqsatw(t, p), 0.0);
    }

    #[test]
    fn test_blend() {
        let sat = MagnusSaturation::default();
        let (t, p) = (260.0, 700.0);
        assert_eq!(sat.qsat_blend(t, p, 1.0), sat.qsatw(t, p));
        assert_eq!(sat.qsat_blend(t, p, 0.0), sat.qsati(t, p));
        let mid = sat.qsat_blend(t, p, 0.5);
        assert!((mid - 0.5 * (sat.qsatw(t, p) + sat.qsati(t, p))).abs() < 1e-15);
    }

    #[test]
    fn test_thermo_constants_from_config() {
        let c = ThermoConstants::default();
        assert!((c.epsv - 0.61).abs() < 1e-12);
        assert!((c.fac_sub - c.fac_cond - c.fac_fus).abs() < 1e-9);
    }
}
