/// Global notion of "current frame"
///
/// The counter starts at 0 and only moves forward. A value stamped with
/// frame F is safe to finalize once `current >= F + frames_in_flight`: every
/// command that could reference it has then completed on the device.
#[derive(Debug, Clone)]
pub struct FrameClock {
    current: u64,
    frames_in_flight: u32,
}

impl FrameClock {
    /// Create a clock at frame 0 with the given device latency (at least 1)
    pub fn new(frames_in_flight: u32) -> Self {
        Self {
            current: 0,
            frames_in_flight: frames_in_flight.max(1),
        }
    }

    /// Frame currently being recorded
    pub fn current(&self) -> u64 {
        self.current
    }

    pub fn frames_in_flight(&self) -> u32 {
        self.frames_in_flight
    }

    /// Per-frame resource slot (command streams, fences) of the current frame
    pub fn slot(&self) -> usize {
        (self.current % self.frames_in_flight as u64) as usize
    }

    /// Advance to the next frame and return it
    pub fn advance(&mut self) -> u64 {
        self.current += 1;
        self.current
    }

    /// Whether work stamped with `frame` has provably finished at `current`
    pub fn is_frame_safe(frame: u64, current: u64, frames_in_flight: u32) -> bool {
        frame + frames_in_flight as u64 <= current
    }

    /// Whether work stamped with `frame` has provably finished now
    pub fn is_safe(&self, frame: u64) -> bool {
        Self::is_frame_safe(frame, self.current, self.frames_in_flight)
    }
}

#[cfg(test)]
#[path = "frame_clock_tests.rs"]
mod tests;
