//! Transaction Builder: turns a [`BaseConfig`] into the CFG-VALSET
//! transactions that put the receiver into (or take it out of) base
//! station mode.

use anyhow::{Context, Result};
use bytes::Bytes;

use crate::{
    base::config::{BaseConfig, PosType, TimeMode},
    protocol::ubx::valset::{
        self, encode_valset, msgout_nav_svin_key, msgout_rtcm_key, CfgVal, LAYER_RAM,
    },
    utils::precision::{split_cm, split_deg},
};

/// RTCM3 message types enabled while the base station is active.
pub const RTCM_OUTPUT_TYPES: [u16; 6] = [1006, 1077, 1087, 1097, 1127, 1230];

/// An ordered set of configuration items written to the device as a single
/// CFG-VALSET. Immutable once built; consumed exactly once by the monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub items: Vec<(u32, CfgVal)>,
    pub layers: u8,
    pub transaction_group: u8,
}

impl Transaction {
    fn new(items: Vec<(u32, CfgVal)>) -> Self {
        // Volatile RAM only; the previous configuration returns on power
        // cycle, which is what a verification tool wants.
        Self {
            items,
            layers: LAYER_RAM,
            transaction_group: 0,
        }
    }

    pub fn encode(&self) -> Bytes {
        encode_valset(self.layers, self.transaction_group, &self.items)
    }
}

/// Build the timing-mode transaction for the configured mode.
pub fn mode_transaction(cfg: &BaseConfig) -> Result<Transaction> {
    match cfg.mode {
        TimeMode::Disabled => Ok(Transaction::new(vec![(
            valset::CFG_TMODE_MODE,
            CfgVal::U1(TimeMode::Disabled as u8),
        )])),
        TimeMode::SurveyIn => Ok(Transaction::new(vec![
            (valset::CFG_TMODE_MODE, CfgVal::U1(cfg.mode as u8)),
            (
                valset::CFG_TMODE_SVIN_ACC_LIMIT,
                CfgVal::U4(acc_limit_tenth_mm(cfg.acc_limit_cm)),
            ),
            (
                valset::CFG_TMODE_SVIN_MIN_DUR,
                CfgVal::U4(cfg.svin_duration_s),
            ),
        ])),
        TimeMode::Fixed => fixed_transaction(cfg),
    }
}

fn fixed_transaction(cfg: &BaseConfig) -> Result<Transaction> {
    let (x, y, z) = cfg.fixed_pos;
    let mut items = vec![
        (valset::CFG_TMODE_MODE, CfgVal::U1(cfg.mode as u8)),
        (valset::CFG_TMODE_POS_TYPE, CfgVal::U1(cfg.pos_type as u8)),
        (
            valset::CFG_TMODE_FIXED_POS_ACC,
            CfgVal::U4(acc_limit_tenth_mm(cfg.acc_limit_cm)),
        ),
    ];
    match cfg.pos_type {
        PosType::Ecef => {
            let (xs, xhp) = split_cm(x).context("fixed position X")?;
            let (ys, yhp) = split_cm(y).context("fixed position Y")?;
            let (zs, zhp) = split_cm(z).context("fixed position Z")?;
            items.extend([
                (valset::CFG_TMODE_ECEF_X, CfgVal::I4(xs)),
                (valset::CFG_TMODE_ECEF_X_HP, CfgVal::I1(xhp)),
                (valset::CFG_TMODE_ECEF_Y, CfgVal::I4(ys)),
                (valset::CFG_TMODE_ECEF_Y_HP, CfgVal::I1(yhp)),
                (valset::CFG_TMODE_ECEF_Z, CfgVal::I4(zs)),
                (valset::CFG_TMODE_ECEF_Z_HP, CfgVal::I1(zhp)),
            ]);
        }
        PosType::Llh => {
            let (lat, lat_hp) = split_deg(x).context("fixed position latitude")?;
            let (lon, lon_hp) = split_deg(y).context("fixed position longitude")?;
            let (height, height_hp) = split_cm(z).context("fixed position height")?;
            items.extend([
                (valset::CFG_TMODE_LAT, CfgVal::I4(lat)),
                (valset::CFG_TMODE_LAT_HP, CfgVal::I1(lat_hp)),
                (valset::CFG_TMODE_LON, CfgVal::I4(lon)),
                (valset::CFG_TMODE_LON_HP, CfgVal::I1(lon_hp)),
                (valset::CFG_TMODE_HEIGHT, CfgVal::I4(height)),
                (valset::CFG_TMODE_HEIGHT_HP, CfgVal::I1(height_hp)),
            ]);
        }
    }
    Ok(Transaction::new(items))
}

/// Build the output-message toggle transaction: RTCM3 correction messages
/// (plus NAV-SVIN progress for survey-in) at rate 1 when the base is being
/// activated, rate 0 when it is being torn down.
pub fn output_transaction(cfg: &BaseConfig, enable: bool) -> Transaction {
    let port = cfg.port_type.into();
    let rate = enable as u8;
    let mut items = Vec::with_capacity(RTCM_OUTPUT_TYPES.len() + 1);
    if cfg.mode == TimeMode::SurveyIn {
        items.push((msgout_nav_svin_key(port), CfgVal::U1(1)));
    }
    for msg_type in RTCM_OUTPUT_TYPES {
        // all types in the table are mapped, so the lookup cannot miss
        if let Some(key) = msgout_rtcm_key(msg_type, port) {
            items.push((key, CfgVal::U1(rate)));
        }
    }
    Transaction::new(items)
}

/// Accuracy limit conversion: cm to the device's 0.1 mm fixed-point unit.
fn acc_limit_tenth_mm(acc_limit_cm: f64) -> u32 {
    (acc_limit_cm * 100.0).round() as u32
}
