/// A scheduled change to an automatable parameter, following Web Audio
/// `AudioParam` semantics. Times are on the audio clock, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamEvent {
    SetValue { value: f32, time: f64 },
    /// Ramp linearly from the previous event's value to `value` at `end_time`.
    LinearRamp { value: f32, end_time: f64 },
    /// Ramp exponentially from the previous event's value to `value` at `end_time`.
    ExponentialRamp { value: f32, end_time: f64 },
    /// Drop every event scheduled at or after `from`.
    Cancel { from: f64 },
}

impl ParamEvent {
    pub fn time(&self) -> f64 {
        match *self {
            ParamEvent::SetValue { time, .. } => time,
            ParamEvent::LinearRamp { end_time, .. } => end_time,
            ParamEvent::ExponentialRamp { end_time, .. } => end_time,
            ParamEvent::Cancel { from } => from,
        }
    }
}

/// Software evaluation of a parameter's automation timeline.
///
/// Events are kept sorted by time; an event scheduled at the same time as an
/// existing one goes after it. Before the first event the parameter holds its
/// default value, after the last one it holds the last value reached.
#[derive(Debug, Clone)]
pub struct ParamTimeline {
    default_value: f32,
    events: Vec<ParamEvent>,
}

impl ParamTimeline {
    pub fn new(default_value: f32) -> Self {
        Self {
            default_value,
            events: Vec::new(),
        }
    }

    pub fn schedule(&mut self, event: ParamEvent) {
        if let ParamEvent::Cancel { from } = event {
            self.events.retain(|e| e.time() < from);
            return;
        }
        let at = self
            .events
            .iter()
            .position(|e| e.time() > event.time())
            .unwrap_or(self.events.len());
        self.events.insert(at, event);
    }

    pub fn events(&self) -> &[ParamEvent] {
        &self.events
    }

    /// The parameter's value at audio time `t`.
    pub fn value_at(&self, t: f64) -> f32 {
        let mut prev_value = self.default_value;
        let mut prev_time = 0.0;

        for event in &self.events {
            match *event {
                ParamEvent::SetValue { value, time } => {
                    if t < time {
                        return prev_value;
                    }
                    prev_value = value;
                    prev_time = time;
                }
                ParamEvent::LinearRamp { value, end_time } => {
                    if t < end_time {
                        let span = end_time - prev_time;
                        if span <= 0.0 || t < prev_time {
                            return prev_value;
                        }
                        let frac = (t - prev_time) / span;
                        return prev_value + (value - prev_value) * frac as f32;
                    }
                    prev_value = value;
                    prev_time = end_time;
                }
                ParamEvent::ExponentialRamp { value, end_time } => {
                    if t < end_time {
                        let span = end_time - prev_time;
                        // No exponential path through or from zero: hold.
                        let degenerate = prev_value == 0.0
                            || value == 0.0
                            || prev_value.signum() != value.signum();
                        if degenerate || span <= 0.0 || t < prev_time {
                            return prev_value;
                        }
                        let frac = (t - prev_time) / span;
                        let ratio = (value / prev_value) as f64;
                        return (prev_value as f64 * ratio.powf(frac)) as f32;
                    }
                    prev_value = value;
                    prev_time = end_time;
                }
                ParamEvent::Cancel { .. } => {}
            }
        }

        prev_value
    }
}
