//! Transition animations
//!
//! The manager never runs animations itself. It picks an [`AnimationSpec`]
//! for a component entering or leaving, hands it to the host, and waits
//! for the host to report completion through
//! [`ComponentManager::on_animation_end`](crate::ComponentManager::on_animation_end).
//! Listeners interested in that completion are composed with a
//! [`ListenerChain`].

use pane_core::AnimationRes;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Transition kind of a transaction, as seen by the entering and exiting components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Transit(pub u32);

impl Transit {
    /// Bit set on transits that bring something in
    pub const ENTER_MASK: u32 = 0x1000;
    /// Bit set on transits that take something away
    pub const EXIT_MASK: u32 = 0x2000;

    /// No transition
    pub const NONE: Transit = Transit(0);
    /// A component is being added onto the screen
    pub const OPEN: Transit = Transit(1 | Self::ENTER_MASK);
    /// A component is being removed from the screen
    pub const CLOSE: Transit = Transit(2 | Self::EXIT_MASK);
    /// Cross-fade
    pub const FADE: Transit = Transit(3 | Self::ENTER_MASK);

    /// Whether this is [`Transit::NONE`]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    /// The transit used when a transaction is popped
    pub fn reverse(self) -> Transit {
        match self {
            Self::OPEN => Self::CLOSE,
            Self::CLOSE => Self::OPEN,
            Self::FADE => Self::FADE,
            _ => Self::NONE,
        }
    }
}

/// Easing curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interpolator {
    /// Constant rate
    Linear,
    /// Starts fast, slows toward the end
    Decelerate { factor: f32 },
}

impl Interpolator {
    /// Map linear progress in `[0, 1]` to eased progress
    pub fn value(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::Decelerate { factor } => 1.0 - (1.0 - t).powf(2.0 * factor),
        }
    }
}

pub const DECELERATE_QUINT: Interpolator = Interpolator::Decelerate { factor: 2.5 };
pub const DECELERATE_CUBIC: Interpolator = Interpolator::Decelerate { factor: 1.5 };

/// Duration of the built-in transitions
pub const ANIM_DURATION: Duration = Duration::from_millis(220);

/// Built-in animation picked from a transit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationStyle {
    OpenEnter,
    OpenExit,
    CloseEnter,
    CloseExit,
    FadeEnter,
    FadeExit,
}

impl AnimationStyle {
    /// Pick the style for the entering or exiting side of `transit`
    pub fn for_transit(transit: Transit, enter: bool) -> Option<Self> {
        match (transit, enter) {
            (Transit::OPEN, true) => Some(Self::OpenEnter),
            (Transit::OPEN, false) => Some(Self::OpenExit),
            (Transit::CLOSE, true) => Some(Self::CloseEnter),
            (Transit::CLOSE, false) => Some(Self::CloseExit),
            (Transit::FADE, true) => Some(Self::FadeEnter),
            (Transit::FADE, false) => Some(Self::FadeExit),
            _ => None,
        }
    }

    /// The concrete animation for this style
    pub fn spec(self) -> AnimationSpec {
        match self {
            Self::OpenEnter => AnimationSpec::open_close(1.125, 1.0, 0.0, 1.0),
            Self::OpenExit => AnimationSpec::open_close(1.0, 0.975, 1.0, 0.0),
            Self::CloseEnter => AnimationSpec::open_close(0.975, 1.0, 0.0, 1.0),
            Self::CloseExit => AnimationSpec::open_close(1.0, 1.075, 1.0, 0.0),
            Self::FadeEnter => AnimationSpec::fade(0.0, 1.0),
            Self::FadeExit => AnimationSpec::fade(1.0, 0.0),
        }
    }
}

/// Description of an animation the host should play on a view
#[derive(Debug, Clone, PartialEq)]
pub enum AnimationSpec {
    /// Combined scale and alpha animation
    ScaleFade {
        from_scale: f32,
        to_scale: f32,
        scale_curve: Interpolator,
        from_alpha: f32,
        to_alpha: f32,
        alpha_curve: Interpolator,
        duration: Duration,
    },
    /// Alpha only
    Fade {
        from_alpha: f32,
        to_alpha: f32,
        curve: Interpolator,
        duration: Duration,
    },
    /// Host-defined animation resource
    Resource { res: AnimationRes, duration: Duration },
}

impl AnimationSpec {
    /// Scale + alpha animation used by the open/close transits
    pub fn open_close(from_scale: f32, to_scale: f32, from_alpha: f32, to_alpha: f32) -> Self {
        Self::ScaleFade {
            from_scale,
            to_scale,
            scale_curve: DECELERATE_QUINT,
            from_alpha,
            to_alpha,
            alpha_curve: DECELERATE_CUBIC,
            duration: ANIM_DURATION,
        }
    }

    /// Alpha animation used by the fade transit
    pub fn fade(from_alpha: f32, to_alpha: f32) -> Self {
        Self::Fade {
            from_alpha,
            to_alpha,
            curve: DECELERATE_CUBIC,
            duration: ANIM_DURATION,
        }
    }

    /// Total running time
    pub fn duration(&self) -> Duration {
        match self {
            Self::ScaleFade { duration, .. }
            | Self::Fade { duration, .. }
            | Self::Resource { duration, .. } => *duration,
        }
    }
}

/// What a component is asked when the manager wants an animation for it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationRequest {
    pub transit: Transit,
    pub enter: bool,
    pub transition_style: u32,
    /// Custom animation set on the op that moved the component
    pub next: Option<AnimationRes>,
}

/// Observer of a running animation
pub trait AnimationListener: Send {
    fn on_animation_start(&mut self) {}
    fn on_animation_end(&mut self) {}
    /// The animation was dropped before it finished
    fn on_animation_cancel(&mut self) {}
}

/// Ordered composition of listeners.
///
/// Each event is forwarded to every listener in insertion order, so a
/// component's own listener runs before the manager resumes the parked
/// lifecycle transition.
#[derive(Default)]
pub struct ListenerChain {
    listeners: Vec<Box<dyn AnimationListener>>,
}

impl ListenerChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener
    pub fn push(&mut self, listener: Box<dyn AnimationListener>) {
        self.listeners.push(listener);
    }

    /// Append a listener (builder pattern)
    pub fn then(mut self, listener: Box<dyn AnimationListener>) -> Self {
        self.push(listener);
        self
    }

    /// Number of listeners
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl AnimationListener for ListenerChain {
    fn on_animation_start(&mut self) {
        for listener in &mut self.listeners {
            listener.on_animation_start();
        }
    }

    fn on_animation_end(&mut self) {
        for listener in &mut self.listeners {
            listener.on_animation_end();
        }
    }

    fn on_animation_cancel(&mut self) {
        for listener in &mut self.listeners {
            listener.on_animation_cancel();
        }
    }
}

impl std::fmt::Debug for ListenerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerChain")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
