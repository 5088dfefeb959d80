use std::time::{Duration, Instant};

/// Time-based opacity for elements that fade in and out.
///
/// Reversing direction mid-fade continues from the current opacity.
#[derive(Debug, Clone)]
pub struct Fade {
    duration: Duration,
    visible: bool,
    from: f32,
    changed_at: Option<Instant>,
}

impl Fade {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            visible: false,
            from: 0.0,
            changed_at: None,
        }
    }

    pub fn set_visible(&mut self, visible: bool, now: Instant) {
        if visible == self.visible {
            return;
        }
        self.from = self.opacity(now);
        self.visible = visible;
        self.changed_at = Some(now);
    }

    /// Opacity in `0.0..=1.0`
    pub fn opacity(&self, now: Instant) -> f32 {
        let target = if self.visible { 1.0 } else { 0.0 };
        let Some(changed_at) = self.changed_at else {
            return target;
        };
        if self.duration.is_zero() {
            return target;
        }

        let elapsed = now.saturating_duration_since(changed_at);
        let t = (elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0);
        self.from + (target - self.from) * t
    }

    /// Whether anything should be drawn at all
    pub fn is_rendered(&self, now: Instant) -> bool {
        self.opacity(now) > 0.0
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.changed_at
            .is_some_and(|changed_at| now.saturating_duration_since(changed_at) < self.duration)
    }
}
