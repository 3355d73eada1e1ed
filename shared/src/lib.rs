//! Wire protocol shared by the arcade server and its clients.
//!
//! Every WebSocket binary frame carries exactly one event: a flat sequence of
//! little-endian `u16` words whose first word is the event tag.

use thiserror::Error;

pub const FIELD_WIDTH: u16 = 500;
pub const FIELD_HEIGHT: u16 = 500;
pub const MIN_TARGET_WIDTH: u16 = 10;
pub const MIN_TARGET_HEIGHT: u16 = 10;
pub const TARGET_SIZE_VARIANCE: u16 = 100;
/// Bounds are strict, so a narrower side contains no integer point
pub const MIN_CLICKABLE_SIDE: u16 = 2;
pub const MAX_TARGETS: usize = 5;
pub const TARGET_ID_SPACE: u16 = 10_000;

const WORD_SIZE: usize = std::mem::size_of::<u16>();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Tag {
    OnlineCount = 0,
    Score = 1,
    NewTarget = 2,
    Hit = 3,
    Click = 4,
}

impl Tag {
    /// Number of words following the tag
    pub fn field_count(self) -> usize {
        match self {
            Tag::OnlineCount | Tag::Score | Tag::Hit => 1,
            Tag::Click => 2,
            Tag::NewTarget => 5,
        }
    }
}

impl TryFrom<u16> for Tag {
    type Error = DecodeError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Tag::OnlineCount),
            1 => Ok(Tag::Score),
            2 => Ok(Tag::NewTarget),
            3 => Ok(Tag::Hit),
            4 => Ok(Tag::Click),
            other => Err(DecodeError::UnknownTag(other)),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("empty frame")]
    Empty,
    #[error("frame length {0} is not a multiple of 2 bytes")]
    OddLength(usize),
    #[error("unknown event tag {0}")]
    UnknownTag(u16),
    #[error("event {tag:?} expects {expected} fields, got {actual}")]
    FieldCount {
        tag: Tag,
        expected: usize,
        actual: usize,
    },
}

/// A clickable rectangle on the shared field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Target {
    pub id: u16,
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Target {
    pub fn new(id: u16, x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            id,
            x,
            y,
            width,
            height,
        }
    }

    /// Strict containment: points on the border do not count as a hit.
    pub fn contains(&self, x: u16, y: u16) -> bool {
        let (x, y) = (u32::from(x), u32::from(y));
        let (left, top) = (u32::from(self.x), u32::from(self.y));
        let right = left + u32::from(self.width);
        let bottom = top + u32::from(self.height);

        left < x && x < right && top < y && y < bottom
    }

    pub fn center(&self) -> (u16, u16) {
        (
            self.x.saturating_add(self.width / 2),
            self.y.saturating_add(self.height / 2),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    OnlineCount { count: u16 },
    Score { score: u16 },
    NewTarget(Target),
    Hit { target_id: u16 },
    Click { x: u16, y: u16 },
}

impl Event {
    pub fn tag(&self) -> Tag {
        match self {
            Event::OnlineCount { .. } => Tag::OnlineCount,
            Event::Score { .. } => Tag::Score,
            Event::NewTarget(_) => Tag::NewTarget,
            Event::Hit { .. } => Tag::Hit,
            Event::Click { .. } => Tag::Click,
        }
    }

    pub fn to_words(&self) -> Vec<u16> {
        let tag = self.tag() as u16;
        match *self {
            Event::OnlineCount { count } => vec![tag, count],
            Event::Score { score } => vec![tag, score],
            Event::NewTarget(t) => vec![tag, t.id, t.x, t.y, t.width, t.height],
            Event::Hit { target_id } => vec![tag, target_id],
            Event::Click { x, y } => vec![tag, x, y],
        }
    }

    pub fn from_words(words: &[u16]) -> Result<Self, DecodeError> {
        let (&raw_tag, fields) = words.split_first().ok_or(DecodeError::Empty)?;
        let tag = Tag::try_from(raw_tag)?;

        if fields.len() != tag.field_count() {
            return Err(DecodeError::FieldCount {
                tag,
                expected: tag.field_count(),
                actual: fields.len(),
            });
        }

        let event = match tag {
            Tag::OnlineCount => Event::OnlineCount { count: fields[0] },
            Tag::Score => Event::Score { score: fields[0] },
            Tag::NewTarget => Event::NewTarget(Target::new(
                fields[0], fields[1], fields[2], fields[3], fields[4],
            )),
            Tag::Hit => Event::Hit {
                target_id: fields[0],
            },
            Tag::Click => Event::Click {
                x: fields[0],
                y: fields[1],
            },
        };

        Ok(event)
    }
}

pub fn encode(event: &Event) -> Vec<u8> {
    event
        .to_words()
        .into_iter()
        .flat_map(u16::to_le_bytes)
        .collect()
}

pub fn decode(bytes: &[u8]) -> Result<Event, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    if bytes.len() % WORD_SIZE != 0 {
        return Err(DecodeError::OddLength(bytes.len()));
    }

    let words: Vec<u16> = bytes
        .chunks_exact(WORD_SIZE)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    Event::from_words(&words)
}
