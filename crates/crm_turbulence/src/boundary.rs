// crates/crm_turbulence/src/boundary.rs

//! 边界界面与地表 TKE 启动
//!
//! - 底界面 `0` 与顶界面 `nzm` 的浮力及产生项每次调用先清零
//! - 启用地表启动时，首个时间步首个子步用"地表浮力产生 = 耗散"的
//!   局地平衡估计最底层 TKE，避免 TKE 与涡粘性从零起步
//! - 同一开关下，每步都用地表通量驱动底界面

use crate::buoyancy::InterfaceBuoyancy;
use crate::constants::{EQUILIBRIUM_PRODUCTION_FLOOR, SURFACE_TKH_FLOOR};
use crate::context::ClosureContext;
use crate::state::{SurfaceFluxes, ThermoState, TurbulenceFields};
use crate::thermo::ThermoConstants;

/// 清零底界面与顶界面
pub fn zero_boundary_interfaces(work: &mut InterfaceBuoyancy, nzm: usize) {
    for field in [&mut work.buoy_sgs_vert, &mut work.a_prod_bu_vert] {
        field.outer_mut(0).fill(0.0);
        field.outer_mut(nzm).fill(0.0);
    }
}

/// 地表浮力产生项
///
/// ```text
/// a_prod_bu = (1 + εv·qv₀)·β₀·fluxbt + β₀·εv·tsfc·fluxbq
/// ```
#[inline]
pub fn surface_buoyancy_production(
    thermo: &ThermoConstants,
    bet0: f64,
    qv0: f64,
    fluxbt: f64,
    fluxbq: f64,
    tsfc: f64,
) -> f64 {
    (1.0 + thermo.epsv * qv0) * bet0 * fluxbt + bet0 * thermo.epsv * tsfc * fluxbq
}

/// 浮力产生与耗散局地平衡的 TKE
///
/// `a_prod_bu = Cee/grd · tke^(3/2)`，产生项取 `max(1e-20, ½·a_prod_bu)`。
#[inline]
pub fn equilibrium_tke(grd: f64, cee: f64, a_prod_bu: f64) -> f64 {
    (grd / cee * EQUILIBRIUM_PRODUCTION_FLOOR.max(0.5 * a_prod_bu)).powf(2.0 / 3.0)
}

/// 地表 TKE 启动，返回 TKE 被抬高的点数
///
/// 写入 `a_prod_bu_vert[0]`，最底层 `tke` 取初值与平衡值中较大者，
/// 随后 `tk = Ck·grd·√tke`, `tkh = Pr·tk`。
pub fn bootstrap_surface_tke(
    ctx: &ClosureContext,
    state: &ThermoState,
    surface: &SurfaceFluxes,
    fields: &mut TurbulenceFields,
    work: &mut InterfaceBuoyancy,
) -> usize {
    let g = &ctx.geometry;
    let l = ctx.layout;
    let c = &ctx.coefficients;
    let cee = c.ce1 + c.ce2;
    let mut raised = 0;

    for j in 0..g.ny {
        for i in 0..g.nx {
            for icrm in 0..g.ncrms {
                let a_prod = surface_buoyancy_production(
                    &ctx.thermo,
                    ctx.reference.bet[[0, icrm]],
                    state.qv[[0, j, i, icrm]],
                    surface.fluxbt[[j, i, icrm]],
                    surface.fluxbq[[j, i, icrm]],
                    surface.tsfc[[j, i, icrm]],
                );
                work.a_prod_bu_vert[[0, j, i, icrm]] = a_prod;

                let grd = g.grid_scale(0, icrm);
                let tke_eq = equilibrium_tke(grd, cee, a_prod);
                let tke_idx = l.to_tke_index(0, j, i, icrm);
                if tke_eq > fields.tke[tke_idx] {
                    fields.tke[tke_idx] = tke_eq;
                    raised += 1;
                }

                let tk = c.ck * grd * fields.tke[tke_idx].sqrt();
                fields.tk[l.tk_index(0, j, i, icrm)] = tk;
                fields.tkh[l.tkh_index(0, j, i, icrm)] = c.pr * tk;
            }
        }
    }
    raised
}

/// 用地表通量驱动底界面
///
/// `buoy_sgs_vert[0] = −a_prod_bu_vert[0] / (tkh[0] + 0.001)`
pub fn apply_surface_flux_forcing(
    ctx: &ClosureContext,
    state: &ThermoState,
    surface: &SurfaceFluxes,
    fields: &TurbulenceFields,
    work: &mut InterfaceBuoyancy,
) {
    let g = &ctx.geometry;
    for j in 0..g.ny {
        for i in 0..g.nx {
            for icrm in 0..g.ncrms {
                let a_prod = surface_buoyancy_production(
                    &ctx.thermo,
                    ctx.reference.bet[[0, icrm]],
                    state.qv[[0, j, i, icrm]],
                    surface.fluxbt[[j, i, icrm]],
                    surface.fluxbq[[j, i, icrm]],
                    surface.tsfc[[j, i, icrm]],
                );
                let tkh = fields.tkh[ctx.layout.tkh_index(0, j, i, icrm)];
                work.a_prod_bu_vert[[0, j, i, icrm]] = a_prod;
                work.buoy_sgs_vert[[0, j, i, icrm]] = -a_prod / (tkh + SURFACE_TKH_FLOOR);
            }
        }
    }
}
