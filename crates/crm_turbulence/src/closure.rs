// crates/crm_turbulence/src/closure.rs

//! 单元中心闭合更新
//!
//! 每个单元：
//!
//! 1. 由上下两个界面的浮力取平均，确定稳定性限制的混合长度 `smix`
//! 2. 预报模式推进 TKE：`tke += dtn·(max(0, P_sh + P_bu) − ε)`，
//!    Smagorinsky 模式由产生-耗散平衡直接诊断涡粘性
//! 3. 涡粘性不超过三维显式扩散稳定性上限，涡扩散 = Pr × 涡粘性
//!
//! # 耗散
//!
//! ```text
//! ε = min( tke / (4·dt), Cee/smix · tke^(3/2) )
//! ```

use crate::buoyancy::InterfaceBuoyancy;
use crate::constants::{
    ClosureCoefficients, BUOYANCY_FLOOR, DISSIPATION_CAP_STEPS, MIN_MIXING_LENGTH_RATIO,
    MIXING_LENGTH_COEFFICIENT, SHEAR_TK_FLOOR, STABILITY_COEFFICIENT,
};
use crate::context::{ClosureContext, TimeStep};
use crate::diagnostics::BudgetAccumulator;
use crate::state::TurbulenceFields;
use crm_config::ClosureMode;
use crm_foundation::Field4;
use rayon::prelude::*;

/// 三维显式扩散稳定性给出的涡粘性上限
///
/// ```text
/// cx = dx²/dt/grdf_x,  cy = dy²/dt/grdf_y,  cz = dz_eff²/dt/grdf_z
/// tkmax = 0.09 / (1/cx + 1/cy + 1/cz)
/// ```
#[inline]
pub fn stability_limit(dx: f64, dy: f64, dz_eff: f64, dt: f64, grdf: [f64; 3]) -> f64 {
    let cx = dx * dx / dt / grdf[0];
    let cy = dy * dy / dt / grdf[1];
    let cz = dz_eff * dz_eff / dt / grdf[2];
    STABILITY_COEFFICIENT / (1.0 / cx + 1.0 / cy + 1.0 / cz)
}

/// 稳定性限制的混合长度
///
/// 不稳定或中性（`buoy ≤ 0`）取网格尺度，稳定层结下
/// `smix = clamp(√(0.76·tk/Ck/√(buoy + 1e-10)), 0.1·grd, grd)`。
#[inline]
pub fn mixing_length(grd: f64, tk: f64, ck: f64, buoy: f64) -> f64 {
    if buoy <= 0.0 {
        grd
    } else {
        let stable = (MIXING_LENGTH_COEFFICIENT * tk / ck / (buoy + BUOYANCY_FLOOR).sqrt()).sqrt();
        grd.min((MIN_MIXING_LENGTH_RATIO * grd).max(stable))
    }
}

/// 单元更新输入
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CellInput {
    /// 当前 TKE
    pub tke: f64,
    /// 当前涡粘性
    pub tk: f64,
    /// 变形率平方
    pub def2: f64,
    /// 下界面浮力
    pub buoy_lower: f64,
    /// 上界面浮力
    pub buoy_upper: f64,
    /// 下界面浮力产生项
    pub a_prod_lower: f64,
    /// 上界面浮力产生项
    pub a_prod_upper: f64,
    /// 网格尺度 `dz·adz`
    pub grd: f64,
    /// 涡粘性上限
    pub tkmax: f64,
}

/// 单元更新结果
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CellUpdate {
    /// 新 TKE
    pub tke: f64,
    /// 新涡粘性
    pub tk: f64,
    /// 新涡扩散
    pub tkh: f64,
    /// 剪切产生项
    pub a_prod_sh: f64,
    /// 浮力产生项
    pub a_prod_bu: f64,
    /// 耗散
    pub a_diss: f64,
}

/// 单个单元的闭合更新
pub fn update_cell(
    coeffs: &ClosureCoefficients,
    mode: ClosureMode,
    time: &TimeStep,
    input: &CellInput,
) -> CellUpdate {
    let grd = input.grd;
    let buoy = 0.5 * (input.buoy_lower + input.buoy_upper);
    let smix = mixing_length(grd, input.tk, coeffs.ck, buoy);
    let cee = coeffs.dissipation(smix / grd);
    let a_prod_bu = 0.5 * (input.a_prod_lower + input.a_prod_upper);

    let (tke, tk, a_prod_sh, a_diss) = match mode {
        ClosureMode::Smagorinsky => {
            let ck3 = coeffs.ck * coeffs.ck * coeffs.ck;
            let tk = (ck3 / cee * (input.def2 - coeffs.pr * buoy).max(0.0)).sqrt() * smix * smix;
            let ratio = tk / (coeffs.ck * smix);
            let a_prod_sh = (tk + SHEAR_TK_FLOOR) * input.def2;
            (ratio * ratio, tk, a_prod_sh, a_prod_sh + a_prod_bu)
        }
        ClosureMode::Prognostic => {
            let tke = input.tke.max(0.0);
            let a_prod_sh = (input.tk + SHEAR_TK_FLOOR) * input.def2;
            let a_diss = (tke / (DISSIPATION_CAP_STEPS * time.dt)).min(cee / smix * tke.powf(1.5));
            let tke = (tke + time.dtn * ((a_prod_sh + a_prod_bu).max(0.0) - a_diss)).max(0.0);
            (tke, coeffs.ck * smix * tke.sqrt(), a_prod_sh, a_diss)
        }
    };

    let tk = tk.min(input.tkmax);
    CellUpdate {
        tke,
        tk,
        tkh: coeffs.pr * tk,
        a_prod_sh,
        a_prod_bu,
        a_diss,
    }
}

/// 更新单层所有水平点
#[allow(clippy::too_many_arguments)]
fn update_level(
    ctx: &ClosureContext,
    def2: &Field4,
    work: &InterfaceBuoyancy,
    accumulator: &BudgetAccumulator,
    k: usize,
    tke_plane: &mut [f64],
    tk_plane: &mut [f64],
    tkh_plane: &mut [f64],
) {
    let g = &ctx.geometry;
    let l = &ctx.layout;
    let n_horizontal = g.nx * g.ny;

    for icrm in 0..g.ncrms {
        let grd = g.grid_scale(k, icrm);
        let tkmax = ctx.stability_limit(k, icrm);

        for j in 0..g.ny {
            for i in 0..g.nx {
                let s = l.scalar_plane_offset(j, i, icrm);
                let d = l.flux_plane_offset(j, i, icrm);
                let input = CellInput {
                    tke: tke_plane[s],
                    tk: tk_plane[d],
                    def2: def2[[k, j, i, icrm]],
                    buoy_lower: work.buoy_sgs_vert[[k, j, i, icrm]],
                    buoy_upper: work.buoy_sgs_vert[[k + 1, j, i, icrm]],
                    a_prod_lower: work.a_prod_bu_vert[[k, j, i, icrm]],
                    a_prod_upper: work.a_prod_bu_vert[[k + 1, j, i, icrm]],
                    grd,
                    tkmax,
                };
                let update = update_cell(&ctx.coefficients, ctx.mode, &ctx.time, &input);

                tke_plane[s] = update.tke;
                tk_plane[d] = update.tk;
                tkh_plane[d] = update.tkh;
                accumulator.accumulate(k, icrm, &update, n_horizontal);
            }
        }
    }
}

/// 更新全部 `nzm` 个单元中心层
///
/// 每层只读写自身的 `tke/tk/tkh` 层平面，界面浮力与 `def2` 只读，
/// 各层之间没有数据依赖。诊断量通过原子累加器汇总。
pub fn update_levels(
    ctx: &ClosureContext,
    def2: &Field4,
    work: &InterfaceBuoyancy,
    fields: &mut TurbulenceFields,
    accumulator: &BudgetAccumulator,
    parallel: bool,
) {
    let l = ctx.layout;
    let nzm = ctx.geometry.nzm;
    let scalar_plane = l.scalar_plane_len();
    let flux_plane = l.flux_plane_len();
    let TurbulenceFields { tke, tk, tkh } = fields;

    let tke = &mut tke.outer_mut(l.tke_field)[..nzm * scalar_plane];
    let tk = &mut tk.outer_mut(l.tk_field)[..nzm * flux_plane];
    let tkh = &mut tkh.outer_mut(l.tkh_field)[..nzm * flux_plane];

    if parallel {
        tke.par_chunks_mut(scalar_plane)
            .zip(tk.par_chunks_mut(flux_plane))
            .zip(tkh.par_chunks_mut(flux_plane))
            .enumerate()
            .for_each(|(k, ((tke, tk), tkh))| update_level(ctx, def2, work, accumulator, k, tke, tk, tkh));
    } else {
        tke.chunks_mut(scalar_plane)
            .zip(tk.chunks_mut(flux_plane))
            .zip(tkh.chunks_mut(flux_plane))
            .enumerate()
            .for_each(|(k, ((tke, tk), tkh))| update_level(ctx, def2, work, accumulator, k, tke, tk, tkh));
    }
}
