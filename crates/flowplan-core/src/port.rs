//! Port addressing.
//!
//! A port id is the composite `side × form × io × slot`, written
//! `<side>:<form>:<io>:<slot>` (e.g. `left:solid:in:0`). Within one node no
//! two ports share an id; the slot disambiguates ports that share the other
//! three components. Ids are node-local: rotation changes where a port is
//! drawn, never its id.

use crate::catalog::{Item, MaterialForm};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// Which edge of the node a port sits on, in the node's own frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Top,
    Right,
    Bottom,
}

impl Side {
    /// All sides in the order logistics nodes declare them.
    pub const ALL: [Side; 4] = [Side::Left, Side::Top, Side::Right, Side::Bottom];

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Top => "top",
            Side::Right => "right",
            Side::Bottom => "bottom",
        }
    }

    /// The on-screen side after turning the node clockwise by `rotation`.
    pub fn rotated(self, rotation: Rotation) -> Side {
        let index = Side::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Side::ALL[(index + rotation.quarter_turns() as usize) % 4]
    }
}

/// Belt-borne or pipe-borne.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Form {
    Solid,
    Fluid,
}

impl Form {
    pub fn as_str(self) -> &'static str {
        match self {
            Form::Solid => "solid",
            Form::Fluid => "fluid",
        }
    }

    /// `liquid`/`gas` travel through pipes; everything else, including items
    /// with no recorded form, travels on belts.
    pub fn of_material(form: Option<MaterialForm>) -> Form {
        match form {
            Some(MaterialForm::Liquid | MaterialForm::Gas) => Form::Fluid,
            Some(MaterialForm::Solid) | None => Form::Solid,
        }
    }

    pub fn of_item(item: &Item) -> Form {
        Form::of_material(item.form)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Io {
    In,
    Out,
}

impl Io {
    pub fn as_str(self) -> &'static str {
        match self {
            Io::In => "in",
            Io::Out => "out",
        }
    }
}

/// Node rotation in clockwise quarter turns. Deserializes from degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub struct Rotation(u8);

impl Rotation {
    /// Degrees are normalized into `0..360` and truncated to whole quarter turns.
    pub fn from_degrees(degrees: i64) -> Self {
        Self((degrees.rem_euclid(360) / 90) as u8)
    }

    pub fn quarter_turns(self) -> u8 {
        self.0
    }

    pub fn degrees(self) -> i64 {
        i64::from(self.0) * 90
    }
}

impl From<i64> for Rotation {
    fn from(degrees: i64) -> Self {
        Rotation::from_degrees(degrees)
    }
}

impl From<Rotation> for i64 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

// ---------------------------------------------------------------------------
// Port id
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PortId {
    pub side: Side,
    pub form: Form,
    pub io: Io,
    pub slot: u8,
}

impl PortId {
    pub const fn new(side: Side, form: Form, io: Io, slot: u8) -> Self {
        Self {
            side,
            form,
            io,
            slot,
        }
    }

    /// Where the port is drawn once the node is rotated.
    pub fn world_side(&self, rotation: Rotation) -> Side {
        self.side.rotated(rotation)
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.side.as_str(),
            self.form.as_str(),
            self.io.as_str(),
            self.slot
        )
    }
}

impl FromStr for PortId {
    type Err = PortParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || PortParseError(s.to_string());
        let mut parts = s.split(':');
        let side = match parts.next() {
            Some("left") => Side::Left,
            Some("top") => Side::Top,
            Some("right") => Side::Right,
            Some("bottom") => Side::Bottom,
            _ => return Err(malformed()),
        };
        let form = match parts.next() {
            Some("solid") => Form::Solid,
            Some("fluid") => Form::Fluid,
            _ => return Err(malformed()),
        };
        let io = match parts.next() {
            Some("in") => Io::In,
            Some("out") => Io::Out,
            _ => return Err(malformed()),
        };
        let slot = parts
            .next()
            .and_then(|slot| slot.parse::<u8>().ok())
            .ok_or_else(malformed)?;
        if parts.next().is_some() {
            return Err(malformed());
        }
        Ok(PortId::new(side, form, io, slot))
    }
}

impl TryFrom<String> for PortId {
    type Error = PortParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PortId> for String {
    fn from(port: PortId) -> Self {
        port.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed port id: {0:?}")]
pub struct PortParseError(pub String);

// ---------------------------------------------------------------------------
// Slot assignment
// ---------------------------------------------------------------------------

/// Hands out the next unused slot per `(form, io)` combination.
///
/// Slots are a `u8`, so each combination has 256 of them. Once they run out
/// `next` returns `None` for good rather than reusing the last one.
#[derive(Debug, Default)]
pub struct SlotCounter {
    solid_in: u16,
    solid_out: u16,
    fluid_in: u16,
    fluid_out: u16,
}

impl SlotCounter {
    pub fn next(&mut self, form: Form, io: Io) -> Option<u8> {
        let counter = match (form, io) {
            (Form::Solid, Io::In) => &mut self.solid_in,
            (Form::Solid, Io::Out) => &mut self.solid_out,
            (Form::Fluid, Io::In) => &mut self.fluid_in,
            (Form::Fluid, Io::Out) => &mut self.fluid_out,
        };
        let slot = u8::try_from(*counter).ok()?;
        *counter += 1;
        Some(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_id_renders_canonical_text() {
        let port = PortId::new(Side::Left, Form::Solid, Io::In, 0);
        assert_eq!(port.to_string(), "left:solid:in:0");
        let port = PortId::new(Side::Right, Form::Fluid, Io::Out, 2);
        assert_eq!(port.to_string(), "right:fluid:out:2");
    }

    #[test]
    fn port_id_parses_its_own_text() {
        for side in Side::ALL {
            for form in [Form::Solid, Form::Fluid] {
                for io in [Io::In, Io::Out] {
                    let port = PortId::new(side, form, io, 3);
                    assert_eq!(port.to_string().parse::<PortId>().unwrap(), port);
                }
            }
        }
    }

    #[test]
    fn malformed_port_ids_are_rejected() {
        for text in [
            "",
            "left",
            "left:solid:in",
            "left:solid:in:x",
            "up:solid:in:0",
            "left:gas:in:0",
            "left:solid:sideways:0",
            "left:solid:in:0:extra",
            "left:solid:in:256",
        ] {
            assert!(text.parse::<PortId>().is_err(), "accepted {text:?}");
        }
    }

    #[test]
    fn port_id_serializes_as_string() {
        let port = PortId::new(Side::Top, Form::Solid, Io::Out, 0);
        let json = serde_json::to_string(&port).unwrap();
        assert_eq!(json, "\"top:solid:out:0\"");
        let back: PortId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, port);
        assert!(serde_json::from_str::<PortId>("\"nope\"").is_err());
    }

    #[test]
    fn material_form_maps_to_port_form() {
        assert_eq!(Form::of_material(Some(MaterialForm::Solid)), Form::Solid);
        assert_eq!(Form::of_material(Some(MaterialForm::Liquid)), Form::Fluid);
        assert_eq!(Form::of_material(Some(MaterialForm::Gas)), Form::Fluid);
        assert_eq!(Form::of_material(None), Form::Solid);
    }

    #[test]
    fn slot_counter_tracks_each_combination() {
        let mut slots = SlotCounter::default();
        assert_eq!(slots.next(Form::Solid, Io::In), Some(0));
        assert_eq!(slots.next(Form::Solid, Io::In), Some(1));
        assert_eq!(slots.next(Form::Fluid, Io::In), Some(0));
        assert_eq!(slots.next(Form::Solid, Io::Out), Some(0));
        assert_eq!(slots.next(Form::Fluid, Io::Out), Some(0));
        assert_eq!(slots.next(Form::Solid, Io::In), Some(2));
    }

    #[test]
    fn slot_counter_runs_out_after_256() {
        let mut slots = SlotCounter::default();
        for expected in 0..=u8::MAX {
            assert_eq!(slots.next(Form::Solid, Io::Out), Some(expected));
        }
        assert_eq!(slots.next(Form::Solid, Io::Out), None);
        assert_eq!(slots.next(Form::Solid, Io::Out), None);
        // Other combinations keep their own slots.
        assert_eq!(slots.next(Form::Solid, Io::In), Some(0));
    }

    #[test]
    fn rotation_turns_sides_clockwise() {
        let quarter = Rotation::from_degrees(90);
        assert_eq!(Side::Left.rotated(quarter), Side::Top);
        assert_eq!(Side::Bottom.rotated(quarter), Side::Left);
        assert_eq!(Side::Right.rotated(Rotation::from_degrees(180)), Side::Left);
        assert_eq!(Side::Top.rotated(Rotation::default()), Side::Top);
    }

    #[test]
    fn rotation_normalizes_degrees() {
        assert_eq!(Rotation::from_degrees(450), Rotation::from_degrees(90));
        assert_eq!(Rotation::from_degrees(-90), Rotation::from_degrees(270));
        assert_eq!(Rotation::from_degrees(270).degrees(), 270);
        let rotation: Rotation = serde_json::from_str("180").unwrap();
        assert_eq!(rotation.quarter_turns(), 2);
    }

    #[test]
    fn world_side_keeps_port_id_stable() {
        let port = PortId::new(Side::Right, Form::Solid, Io::Out, 0);
        assert_eq!(port.world_side(Rotation::from_degrees(90)), Side::Bottom);
        assert_eq!(port.to_string(), "right:solid:out:0");
    }
}
