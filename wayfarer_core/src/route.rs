use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{geometry::GeoPoint, voice::audio_clip::AudioClip};

const METERS_PER_MILE: f64 = 1_609.344;
const METERS_PER_KILOMETER: f64 = 1_000.0;

/// Unit every length of a [`Route`] is expressed in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceUnit {
    #[default]
    Miles,
    Kilometers,
}

impl DistanceUnit {
    pub fn from_meters(&self, meters: f64) -> f64 {
        match self {
            DistanceUnit::Miles => meters / METERS_PER_MILE,
            DistanceUnit::Kilometers => meters / METERS_PER_KILOMETER,
        }
    }

    pub fn to_meters(&self, value: f64) -> f64 {
        match self {
            DistanceUnit::Miles => value * METERS_PER_MILE,
            DistanceUnit::Kilometers => value * METERS_PER_KILOMETER,
        }
    }

    pub fn abbreviation(&self) -> &'static str {
        match self {
            DistanceUnit::Miles => "mi",
            DistanceUnit::Kilometers => "km",
        }
    }
}

impl Display for DistanceUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                DistanceUnit::Miles => "miles",
                DistanceUnit::Kilometers => "kilometers",
            }
        )
    }
}

/// Which spoken text of a maneuver a cue refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CueKind {
    Instruction,
    PreTransition,
    PostTransition,
}

impl CueKind {
    pub const ALL: [CueKind; 3] = [
        CueKind::Instruction,
        CueKind::PreTransition,
        CueKind::PostTransition,
    ];
}

impl Display for CueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                CueKind::Instruction => "instruction",
                CueKind::PreTransition => "pre_transition",
                CueKind::PostTransition => "post_transition",
            }
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum CueStatus {
    #[default]
    Pending,
    Queued,
    Played,
}

/// One spoken text of a maneuver together with its audio and delivery status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CueSlot {
    text: String,

    #[serde(skip)]
    audio: Option<AudioClip>,

    #[serde(skip)]
    status: CueStatus,
}

impl CueSlot {
    pub fn new(text: impl Into<String>) -> Self {
        CueSlot {
            text: text.into(),
            audio: None,
            status: CueStatus::Pending,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn audio(&self) -> Option<&AudioClip> {
        self.audio.as_ref()
    }

    pub fn status(&self) -> CueStatus {
        self.status
    }

    pub fn set_audio(&mut self, audio: AudioClip) {
        self.audio = Some(audio);
    }

    /// A cue can be queued once: it must be pending and have audio to play.
    pub fn is_ready(&self) -> bool {
        self.status == CueStatus::Pending && self.audio.is_some()
    }

    /// Moves a pending cue to queued. Returns `false` when the cue was already
    /// queued or played.
    pub fn mark_queued(&mut self) -> bool {
        if self.status != CueStatus::Pending {
            return false;
        }
        self.status = CueStatus::Queued;
        true
    }

    /// Returns `false` when the cue was already played.
    pub fn mark_played(&mut self) -> bool {
        if self.status == CueStatus::Played {
            return false;
        }
        self.status = CueStatus::Played;
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Maneuver {
    pub begin_shape_index: usize,
    pub end_shape_index: usize,

    /// Length in the route's [`DistanceUnit`]
    pub length: f64,

    /// Duration in seconds
    pub time: f64,

    #[serde(default)]
    pub instruction: Option<CueSlot>,
    #[serde(default)]
    pub verbal_pre_transition: Option<CueSlot>,
    #[serde(default)]
    pub verbal_post_transition: Option<CueSlot>,
}

impl Maneuver {
    pub fn cue(&self, kind: CueKind) -> Option<&CueSlot> {
        match kind {
            CueKind::Instruction => self.instruction.as_ref(),
            CueKind::PreTransition => self.verbal_pre_transition.as_ref(),
            CueKind::PostTransition => self.verbal_post_transition.as_ref(),
        }
    }

    pub fn cue_mut(&mut self, kind: CueKind) -> Option<&mut CueSlot> {
        match kind {
            CueKind::Instruction => self.instruction.as_mut(),
            CueKind::PreTransition => self.verbal_pre_transition.as_mut(),
            CueKind::PostTransition => self.verbal_post_transition.as_mut(),
        }
    }

    pub fn instruction_text(&self) -> &str {
        self.instruction.as_ref().map(CueSlot::text).unwrap_or_default()
    }

    pub fn contains_segment(&self, start: usize, end: usize) -> bool {
        (self.begin_shape_index..=self.end_shape_index).contains(&start)
            && (self.begin_shape_index..=self.end_shape_index).contains(&end)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripSummary {
    /// Length in the route's [`DistanceUnit`]
    pub length: f64,

    /// Duration in seconds
    pub time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leg {
    pub maneuvers: Vec<Maneuver>,
    pub summary: TripSummary,
}

#[derive(Debug, Error, PartialEq)]
pub enum RouteValidationError {
    #[error("route has no legs")]
    NoLegs,

    #[error("route has an empty shape")]
    EmptyShape,

    #[error("maneuver {maneuver} spans {begin}..={end} which is outside a shape of {len} points")]
    OutOfBounds {
        maneuver: usize,
        begin: usize,
        end: usize,
        len: usize,
    },

    #[error("maneuver {maneuver} begins at {begin}, the previous one ends at {previous_end}")]
    NotContiguous {
        maneuver: usize,
        begin: usize,
        previous_end: usize,
    },
}

/// Index of a maneuver across all legs of a route.
pub type ManeuverIdx = usize;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    shape: Vec<GeoPoint>,
    legs: Vec<Leg>,
    summary: TripSummary,
    units: DistanceUnit,
}

impl Route {
    pub fn new(
        shape: Vec<GeoPoint>,
        legs: Vec<Leg>,
        summary: TripSummary,
        units: DistanceUnit,
    ) -> Result<Self, RouteValidationError> {
        let route = Route {
            shape,
            legs,
            summary,
            units,
        };
        route.validate()?;
        Ok(route)
    }

    pub fn validate(&self) -> Result<(), RouteValidationError> {
        if self.legs.is_empty() {
            return Err(RouteValidationError::NoLegs);
        }
        if self.shape.is_empty() {
            return Err(RouteValidationError::EmptyShape);
        }

        let mut index = 0;
        for leg in &self.legs {
            let mut previous_end: Option<usize> = None;
            for maneuver in &leg.maneuvers {
                if maneuver.begin_shape_index > maneuver.end_shape_index
                    || maneuver.end_shape_index >= self.shape.len()
                {
                    return Err(RouteValidationError::OutOfBounds {
                        maneuver: index,
                        begin: maneuver.begin_shape_index,
                        end: maneuver.end_shape_index,
                        len: self.shape.len(),
                    });
                }

                if let Some(previous_end) = previous_end
                    && previous_end != maneuver.begin_shape_index
                {
                    return Err(RouteValidationError::NotContiguous {
                        maneuver: index,
                        begin: maneuver.begin_shape_index,
                        previous_end,
                    });
                }

                previous_end = Some(maneuver.end_shape_index);
                index += 1;
            }
        }

        Ok(())
    }

    pub fn shape(&self) -> &[GeoPoint] {
        &self.shape
    }

    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    pub fn summary(&self) -> &TripSummary {
        &self.summary
    }

    pub fn units(&self) -> DistanceUnit {
        self.units
    }

    pub fn maneuvers_iter(&self) -> impl Iterator<Item = &Maneuver> {
        self.legs.iter().flat_map(|leg| leg.maneuvers.iter())
    }

    pub fn maneuver_count(&self) -> usize {
        self.legs.iter().map(|leg| leg.maneuvers.len()).sum()
    }

    pub fn maneuver(&self, index: ManeuverIdx) -> Option<&Maneuver> {
        self.maneuvers_iter().nth(index)
    }

    pub fn maneuver_mut(&mut self, index: ManeuverIdx) -> Option<&mut Maneuver> {
        self.legs
            .iter_mut()
            .flat_map(|leg| leg.maneuvers.iter_mut())
            .nth(index)
    }

    pub fn is_first_in_leg(&self, index: ManeuverIdx) -> bool {
        let mut offset = 0;
        for leg in &self.legs {
            if index == offset {
                return true;
            }
            offset += leg.maneuvers.len();
            if index < offset {
                return false;
            }
        }
        false
    }

    /// The first maneuver whose shape range contains both ends of the segment.
    pub fn find_maneuver(&self, segment: (usize, usize)) -> Option<ManeuverIdx> {
        self.maneuvers_iter()
            .position(|maneuver| maneuver.contains_segment(segment.0, segment.1))
    }

    /// Every instruction text of every maneuver, addressed by maneuver and kind.
    pub fn cue_texts(&self) -> Vec<(ManeuverIdx, CueKind, String)> {
        self.maneuvers_iter()
            .enumerate()
            .flat_map(|(index, maneuver)| {
                CueKind::ALL.into_iter().filter_map(move |kind| {
                    maneuver
                        .cue(kind)
                        .map(|cue| (index, kind, cue.text().to_owned()))
                })
            })
            .collect()
    }

    pub fn destination(&self) -> Option<&GeoPoint> {
        self.shape.last()
    }
}
