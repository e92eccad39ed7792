//! Flood stage resolution at a queried point.
//!
//! Converts basin discharge into a water-surface elevation through a linear
//! rating curve, then compares the ground elevation at the point against it.

use crate::config::StageConfig;
use serde::Serialize;

/// Channel classification of a queried point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChannelStatus {
    #[serde(rename = "Active Channel")]
    ActiveChannel,
    #[serde(rename = "Inundated Floodplain")]
    InundatedFloodplain,
    #[serde(rename = "Deep Channel")]
    DeepChannel,
    #[serde(rename = "Dry Terrain")]
    DryTerrain,
}

impl ChannelStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ChannelStatus::ActiveChannel => "Active Channel",
            ChannelStatus::InundatedFloodplain => "Inundated Floodplain",
            ChannelStatus::DeepChannel => "Deep Channel",
            ChannelStatus::DryTerrain => "Dry Terrain",
        }
    }

    /// True for every class that carries river flow.
    pub fn is_river(&self) -> bool {
        !matches!(self, ChannelStatus::DryTerrain)
    }
}

/// Stage at one point for one discharge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageResult {
    pub elevation: f64,
    pub is_river: bool,
    pub status: ChannelStatus,
    /// Depth of water above ground; zero at and above the water surface.
    pub flood_depth: f64,
    /// Depth of a deep channel bed below the channel reference level.
    pub channel_depth: f64,
    pub local_discharge: f64,
    pub water_level: f64,
}

/// Rating-curve stage resolver.
#[derive(Debug, Clone)]
pub struct StageResolver {
    stage: StageConfig,
}

impl StageResolver {
    pub fn new(stage: StageConfig) -> Self {
        StageResolver { stage }
    }

    /// Water-surface elevation for a basin discharge.
    pub fn water_surface(&self, discharge_cusecs: f64) -> f64 {
        self.stage.base_channel_level_m + discharge_cusecs.max(0.0) / self.stage.rise_divisor
    }

    /// Discharge carried at a point with `depth` metres of water.
    fn local_flow(&self, discharge_cusecs: f64, depth: f64) -> f64 {
        let ratio = (depth / self.stage.max_depth_proxy_m).min(1.0);
        (discharge_cusecs * ratio.powf(1.5)).max(self.stage.min_visible_flow)
    }

    /// Resolve the stage at ground `elevation` for `discharge_cusecs`.
    pub fn resolve(&self, elevation: f64, discharge_cusecs: f64) -> StageResult {
        let surface = self.water_surface(discharge_cusecs);
        let discharge = discharge_cusecs.max(0.0);

        let (status, flood_depth, channel_depth, local_discharge) = if elevation < surface {
            let status = if elevation < self.stage.active_channel_m {
                ChannelStatus::ActiveChannel
            } else {
                ChannelStatus::InundatedFloodplain
            };
            let depth = surface - elevation;
            (status, depth, 0.0, self.local_flow(discharge, depth))
        } else if elevation <= self.stage.deep_channel_m {
            let depth = self.stage.deep_channel_m - elevation;
            (ChannelStatus::DeepChannel, 0.0, depth, self.local_flow(discharge, depth))
        } else {
            (ChannelStatus::DryTerrain, 0.0, 0.0, 0.0)
        };

        StageResult {
            elevation: round_to(elevation, 3),
            is_river: status.is_river(),
            status,
            flood_depth: round_to(flood_depth, 2),
            channel_depth: round_to(channel_depth, 2),
            local_discharge: local_discharge.round(),
            water_level: round_to(surface, 2),
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
