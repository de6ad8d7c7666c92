// crates/crm_turbulence/src/buoyancy.rs

//! 界面亚网格浮力通量
//!
//! 在单元 `k` 与 `k+1` 之间的界面 `k+1` 上计算湿亚网格浮力
//! `buoy_sgs` 与浮力产生项 `a_prod_bu`。
//!
//! # 晴空关系
//!
//! 以两层的"全部凝结物蒸发/升华"后的混合温度 T* 与总水 qt* 为参考：
//!
//! ```text
//! bbb  = 1 + εv·qt* − qp*
//! buoy = βdz·[ bbb·Δt + εv·T*·Δqt + (bbb·Lc/cp − T*)·Δqpl + (bbb·Ls/cp − T*)·Δqpi ]
//! ```
//!
//! # 云内关系
//!
//! 当两层含有凝结物且混合后仍过饱和时，改用饱和关系，
//! 饱和混合比及其导数在两层平均温度处取值。
//!
//! 两种情况下产生项都为 `a_prod_bu = −½(tkh[k+1] + tkh[k] + 0.002)·buoy`。

use crate::constants::{CONDENSATE_FLOOR, PRODUCTION_TKH_FLOOR, SATURATED_VIRTUAL_COEFFICIENT};
use crate::context::{ClosureContext, ColumnGeometry};
use crate::state::{ThermoState, TurbulenceFields};
use crate::thermo::{SaturationMixingRatio, ThermoConstants};
use crm_foundation::Field4;
use rayon::prelude::*;

/// 界面上的浮力与浮力产生项工作数组，形状 `(nzm + 1, ny, nx, ncrms)`
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceBuoyancy {
    /// 亚网格浮力 N²（界面）
    pub buoy_sgs_vert: Field4,
    /// 浮力产生项（界面）
    pub a_prod_bu_vert: Field4,
}

impl InterfaceBuoyancy {
    /// 零初始化
    pub fn new(geometry: &ColumnGeometry) -> Self {
        let dims = [geometry.nz(), geometry.ny, geometry.nx, geometry.ncrms];
        Self {
            buoy_sgs_vert: Field4::zeros(dims),
            a_prod_bu_vert: Field4::zeros(dims),
        }
    }
}

/// 界面状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceRegime {
    /// 未饱和（含无凝结物情形）
    Clear,
    /// 饱和混合
    Cloudy,
}

/// 单层采样值
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayerSample {
    /// 绝对温度
    pub tabs: f64,
    /// 水汽
    pub qv: f64,
    /// 云水
    pub qcl: f64,
    /// 云冰
    pub qci: f64,
    /// 液态降水
    pub qpl: f64,
    /// 固态降水
    pub qpi: f64,
    /// 液冰静力能
    pub t: f64,
    /// 涡扩散
    pub tkh: f64,
}

impl LayerSample {
    #[inline]
    fn total_water(&self) -> f64 {
        self.qv + self.qcl + self.qci
    }

    #[inline]
    fn condensate(&self) -> f64 {
        self.qcl + self.qci
    }

    #[inline]
    fn precipitation(&self) -> f64 {
        self.qpl + self.qpi
    }

    #[inline]
    fn evaporated_temperature(&self, thermo: &ThermoConstants) -> f64 {
        self.tabs + thermo.fac_cond * self.qcl + thermo.fac_sub * self.qci
    }
}

/// 单个界面的计算结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterfaceFlux {
    /// 亚网格浮力
    pub buoy_sgs: f64,
    /// 浮力产生项
    pub a_prod_bu: f64,
    /// 所用关系
    pub regime: InterfaceRegime,
}

/// 计算一个界面上的浮力与产生项
///
/// `betdz` 为界面上的 `β/Δz`，`presi` 为界面气压 [hPa]。
pub fn interface_flux<S: SaturationMixingRatio + ?Sized>(
    thermo: &ThermoConstants,
    sat: &S,
    betdz: f64,
    presi: f64,
    below: &LayerSample,
    above: &LayerSample,
) -> InterfaceFlux {
    let tabs_mix = 0.5 * (above.evaporated_temperature(thermo) + below.evaporated_temperature(thermo));
    let qtot = 0.5 * (above.total_water() + below.total_water());
    let qp = 0.5 * (above.precipitation() + below.precipitation());

    let dt = above.t - below.t;
    let dqt = above.total_water() - below.total_water();
    let dqpl = above.qpl - below.qpl;
    let dqpi = above.qpi - below.qpi;

    let bbb = 1.0 + thermo.epsv * qtot - qp;
    let mut buoy_sgs = betdz
        * (bbb * dt
            + thermo.epsv * tabs_mix * dqt
            + (bbb * thermo.fac_cond - tabs_mix) * dqpl
            + (bbb * thermo.fac_sub - tabs_mix) * dqpi);
    let mut regime = InterfaceRegime::Clear;

    let qctot = above.condensate() + below.condensate();
    if qctot > 0.0 {
        let omn = (above.qcl + below.qcl) / (qctot + CONDENSATE_FLOOR);
        let qsat_check = sat.qsat_blend(tabs_mix, presi, omn);

        if qtot > qsat_check {
            let lstarn = thermo.fac_cond + (1.0 - omn) * thermo.fac_fus;
            let tabs_mean = 0.5 * (above.tabs + below.tabs);
            let dqsat = sat.dtqsat_blend(tabs_mean, presi, omn);
            let qsatt = sat.qsat_blend(tabs_mean, presi, omn);

            let bbb = (1.0 + thermo.epsv * qsatt + qsatt - qtot - qp
                + SATURATED_VIRTUAL_COEFFICIENT * tabs_mean * dqsat)
                / (1.0 + lstarn * dqsat);

            // 降水项用下层温度
            buoy_sgs = betdz
                * (bbb * dt
                    + (bbb * lstarn - (1.0 + lstarn * dqsat) * tabs_mean) * dqt
                    + (bbb * thermo.fac_cond - (1.0 + thermo.fac_cond * dqsat) * below.tabs) * dqpl
                    + (bbb * thermo.fac_sub - (1.0 + thermo.fac_sub * dqsat) * below.tabs) * dqpi);
            regime = InterfaceRegime::Cloudy;
        }
    }

    InterfaceFlux {
        buoy_sgs,
        a_prod_bu: -0.5 * (above.tkh + below.tkh + PRODUCTION_TKH_FLOOR) * buoy_sgs,
        regime,
    }
}

fn sample(ctx: &ClosureContext, state: &ThermoState, fields: &TurbulenceFields, k: usize, j: usize, i: usize, icrm: usize) -> LayerSample {
    let idx = [k, j, i, icrm];
    LayerSample {
        tabs: state.tabs[idx],
        qv: state.qv[idx],
        qcl: state.qcl[idx],
        qci: state.qci[idx],
        qpl: state.qpl[idx],
        qpi: state.qpi[idx],
        t: state.t[ctx.layout.scalar_index(k, j, i, icrm)],
        tkh: fields.tkh[ctx.layout.tkh_index(k, j, i, icrm)],
    }
}

/// 填充界面 `kw`（位于单元 `kw-1` 与 `kw` 之间）的一个水平平面，返回云内界面数
#[allow(clippy::too_many_arguments)]
fn interface_plane<S: SaturationMixingRatio + ?Sized>(
    ctx: &ClosureContext,
    state: &ThermoState,
    fields: &TurbulenceFields,
    sat: &S,
    kw: usize,
    buoy_plane: &mut [f64],
    a_prod_plane: &mut [f64],
) -> usize {
    let g = &ctx.geometry;
    let (kb, kc) = (kw - 1, kw);
    let mut cloudy = 0;

    for icrm in 0..g.ncrms {
        let betdz = 0.5 * (ctx.reference.bet[[kc, icrm]] + ctx.reference.bet[[kb, icrm]])
            / g.interface_spacing(kw, icrm);
        let presi = ctx.reference.presi[[kw, icrm]];

        for j in 0..g.ny {
            for i in 0..g.nx {
                let below = sample(ctx, state, fields, kb, j, i, icrm);
                let above = sample(ctx, state, fields, kc, j, i, icrm);
                let flux = interface_flux(&ctx.thermo, sat, betdz, presi, &below, &above);

                let off = ctx.layout.interior_plane_offset(j, i, icrm);
                buoy_plane[off] = flux.buoy_sgs;
                a_prod_plane[off] = flux.a_prod_bu;
                if flux.regime == InterfaceRegime::Cloudy {
                    cloudy += 1;
                }
            }
        }
    }
    cloudy
}

/// 计算所有内部界面的浮力与产生项
///
/// 内部界面为 `1..nzm`：界面 `k+1` 由单元 `k`（下）与 `k+1`（上）决定，
/// `k < nzm − 1` 恒成立，因此不需要顶层的单侧差分。边界界面 `0` 与 `nzm`
/// 不在这里写入。返回云内界面点数。
pub fn compute_interface_fluxes<S: SaturationMixingRatio + ?Sized>(
    ctx: &ClosureContext,
    state: &ThermoState,
    fields: &TurbulenceFields,
    sat: &S,
    work: &mut InterfaceBuoyancy,
    parallel: bool,
) -> usize {
    let nzm = ctx.geometry.nzm;
    let plane = ctx.layout.interior_plane_len();
    let InterfaceBuoyancy {
        buoy_sgs_vert,
        a_prod_bu_vert,
    } = work;

    if parallel {
        buoy_sgs_vert
            .as_mut_slice()
            .par_chunks_mut(plane)
            .zip(a_prod_bu_vert.as_mut_slice().par_chunks_mut(plane))
            .enumerate()
            .skip(1)
            .take(nzm - 1)
            .map(|(kw, (buoy, a_prod))| interface_plane(ctx, state, fields, sat, kw, buoy, a_prod))
            .sum()
    } else {
        buoy_sgs_vert
            .as_mut_slice()
            .chunks_mut(plane)
            .zip(a_prod_bu_vert.as_mut_slice().chunks_mut(plane))
            .enumerate()
            .skip(1)
            .take(nzm - 1)
            .map(|(kw, (buoy, a_prod))| interface_plane(ctx, state, fields, sat, kw, buoy, a_prod))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 常数饱和混合比，导数为零
    struct FixedSaturation(f64);

    impl SaturationMixingRatio for FixedSaturation {
        fn qsatw(&self, _: f64, _: f64) -> f64 {
            self.0
        }
        fn qsati(&self, _: f64, _: f64) -> f64 {
            self.0
        }
        fn dtqsatw(&self, _: f64, _: f64) -> f64 {
            0.0
        }
        fn dtqsati(&self, _: f64, _: f64) -> f64 {
            0.0
        }
    }

    /// 液面/冰面取不同常数，导数非零
    struct SlopedSaturation;

    impl SaturationMixingRatio for SlopedSaturation {
        fn qsatw(&self, _: f64, _: f64) -> f64 {
            0.010
        }
        fn qsati(&self, _: f64, _: f64) -> f64 {
            0.008
        }
        fn dtqsatw(&self, _: f64, _: f64) -> f64 {
            1e-3
        }
        fn dtqsati(&self, _: f64, _: f64) -> f64 {
            5e-4
        }
    }

    fn thermo() -> ThermoConstants {
        ThermoConstants {
            epsv: 0.61,
            fac_cond: 2500.0,
            fac_sub: 2830.0,
            fac_fus: 330.0,
        }
    }

    fn layer(t: f64, qv: f64) -> LayerSample {
        LayerSample {
            tabs: t,
            qv,
            t,
            tkh: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_dry_stable_interface() {
        let below = layer(300.0, 0.0);
        let above = layer(301.0, 0.0);
        let flux = interface_flux(&thermo(), &FixedSaturation(0.01), 0.001, 900.0, &below, &above);
        assert_eq!(flux.regime, InterfaceRegime::Clear);
        assert!((flux.buoy_sgs - 0.001).abs() < 1e-15);
        assert!((flux.a_prod_bu + 0.5 * 2.002 * 0.001).abs() < 1e-15);
    }

    #[test]
    fn test_moist_clear_interface() {
        let below = layer(300.0, 0.010);
        let above = layer(300.0, 0.008);
        let th = thermo();
        let flux = interface_flux(&th, &FixedSaturation(0.02), 0.002, 900.0, &below, &above);
        // Δt = 0，只剩水汽项
        let expected = 0.002 * th.epsv * 300.0 * (-0.002);
        assert!((flux.buoy_sgs - expected).abs() < 1e-14);
        assert!(flux.a_prod_bu > 0.0);
    }

    #[test]
    fn test_cloud_below_saturation_stays_clear() {
        let mut below = layer(290.0, 0.005);
        below.qcl = 1e-4;
        let above = layer(291.0, 0.005);
        let flux = interface_flux(&thermo(), &FixedSaturation(0.5), 0.001, 900.0, &below, &above);
        assert_eq!(flux.regime, InterfaceRegime::Clear);
    }

    #[test]
    fn test_saturated_interface_uses_cloudy_relation() {
        let th = thermo();
        let mut below = layer(290.0, 0.012);
        below.qcl = 1e-3;
        let above = layer(291.0, 0.012);
        let qs = 0.010;
        let flux = interface_flux(&th, &FixedSaturation(qs), 0.001, 900.0, &below, &above);
        assert_eq!(flux.regime, InterfaceRegime::Cloudy);

        // dqsat = 0, omn = 1
        let qtot = 0.5 * (0.013 + 0.012);
        let bbb = 1.0 + th.epsv * qs + qs - qtot;
        let tmean = 290.5;
        let expected = 0.001 * (bbb * 1.0 + (bbb * th.fac_cond - tmean) * (0.012 - 0.013));
        assert!((flux.buoy_sgs - expected).abs() < 1e-14);
        assert!((flux.a_prod_bu + 0.5 * 2.002 * expected).abs() < 1e-14);
    }

    #[test]
    fn test_ice_only_cloud_uses_fusion_heat() {
        let th = thermo();
        let mut below = layer(260.0, 0.003);
        below.qci = 1e-3;
        let above = layer(260.0, 0.003);
        let flux = interface_flux(&th, &FixedSaturation(0.001), 1.0, 600.0, &below, &above);
        assert_eq!(flux.regime, InterfaceRegime::Cloudy);
        // omn = 0 → lstarn = Lc + Lf
        let qtot = 0.5 * (0.004 + 0.003);
        let bbb = 1.0 + th.epsv * 0.001 + 0.001 - qtot;
        let lstarn = th.fac_cond + th.fac_fus;
        let expected = bbb * 0.0 + (bbb * lstarn - 260.0) * (0.003 - 0.004);
        assert!((flux.buoy_sgs - expected).abs() < 1e-12);
    }

    #[test]
    fn test_mixed_phase_cloud_with_saturation_slope() {
        let th = thermo();
        let below = LayerSample {
            tabs: 285.0,
            qv: 0.012,
            qcl: 8e-4,
            qci: 2e-4,
            qpl: 3e-4,
            qpi: 1e-4,
            t: 300.0,
            tkh: 2.0,
        };
        let above = LayerSample {
            tabs: 284.0,
            qv: 0.011,
            qcl: 4e-4,
            qci: 4e-4,
            qpl: 1e-4,
            qpi: 2e-4,
            t: 301.0,
            tkh: 3.0,
        };
        let betdz = 3e-4;
        let flux = interface_flux(&th, &SlopedSaturation, betdz, 850.0, &below, &above);
        assert_eq!(flux.regime, InterfaceRegime::Cloudy);

        let omn = 1.2e-3 / 1.8e-3;
        assert!(omn > 0.0 && omn < 1.0);
        let lstarn = th.fac_cond + (1.0 - omn) * th.fac_fus;
        let dqsat = omn * 1e-3 + (1.0 - omn) * 5e-4;
        let qsatt = omn * 0.010 + (1.0 - omn) * 0.008;
        let qtot = 0.5 * (0.0130 + 0.0118);
        let qp = 0.5 * (4e-4 + 3e-4);
        let tmean = 284.5;

        let bbb = (1.0 + th.epsv * qsatt + qsatt - qtot - qp + 1.61 * tmean * dqsat) / (1.0 + lstarn * dqsat);
        let expected = betdz
            * (bbb * 1.0
                + (bbb * lstarn - (1.0 + lstarn * dqsat) * tmean) * (0.0118 - 0.0130)
                + (bbb * th.fac_cond - (1.0 + th.fac_cond * dqsat) * 285.0) * (1e-4 - 3e-4)
                + (bbb * th.fac_sub - (1.0 + th.fac_sub * dqsat) * 285.0) * (2e-4 - 1e-4));

        let tol = 1e-10 * expected.abs();
        assert!((flux.buoy_sgs - expected).abs() < tol, "buoy={} expected={}", flux.buoy_sgs, expected);
        assert!((flux.a_prod_bu + 0.5 * 5.002 * expected).abs() < tol);

        // 去掉饱和斜率后结果明显不同
        let flat = interface_flux(&th, &FixedSaturation(qsatt), betdz, 850.0, &below, &above);
        assert!((flat.buoy_sgs - expected).abs() > 1e-3 * expected.abs());
    }
}
