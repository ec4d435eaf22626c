//! Detected subjects and the frame geometry they live in.

/// What a detector found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubjectKind {
    Face,
    Person,
}

impl SubjectKind {
    pub fn label(&self) -> &'static str {
        match self {
            SubjectKind::Face => "face",
            SubjectKind::Person => "person",
        }
    }
}

/// Orientation of a frame, derived from its upright dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    /// Square images count as landscape.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if width >= height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Five-point facial landmarks, in image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceLandmarks {
    pub left_eye: Point,
    pub right_eye: Point,
    pub nose: Point,
    pub mouth_left: Point,
    pub mouth_right: Point,
}

impl FaceLandmarks {
    pub fn inter_ocular_distance(&self) -> f64 {
        self.left_eye.distance(&self.right_eye)
    }
}

/// A detected region of interest, in pixels of the resized frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f32,
    pub kind: SubjectKind,
    pub landmarks: Option<FaceLandmarks>,
}

impl Subject {
    pub fn new(kind: SubjectKind, x: f64, y: f64, width: f64, height: f64, confidence: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence,
            kind,
            landmarks: None,
        }
    }

    pub fn face(x: f64, y: f64, width: f64, height: f64, confidence: f32) -> Self {
        Self::new(SubjectKind::Face, x, y, width, height, confidence)
    }

    pub fn person(x: f64, y: f64, width: f64, height: f64, confidence: f32) -> Self {
        Self::new(SubjectKind::Person, x, y, width, height, confidence)
    }

    pub fn with_landmarks(mut self, landmarks: FaceLandmarks) -> Self {
        self.landmarks = Some(landmarks);
        self
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Clip the box to a `width` x `height` frame.
    ///
    /// Returns `None` when nothing of the box lies inside the frame, or when a
    /// coordinate is not finite.
    pub fn clamped_to(&self, width: u32, height: u32) -> Option<Subject> {
        if ![self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
        {
            return None;
        }

        let x0 = self.x.max(0.0);
        let y0 = self.y.max(0.0);
        let x1 = self.right().min(width as f64);
        let y1 = self.bottom().min(height as f64);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(Subject {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
            ..self.clone()
        })
    }
}
