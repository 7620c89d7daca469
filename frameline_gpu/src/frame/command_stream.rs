/// Command stream orchestration
///
/// Every frame slot owns two streams: uploads/transfers and rendering/compute.
/// Both are opened at frame start and closed at frame end; the upload stream
/// is submitted and waited on before the render stream so freshly uploaded
/// data is visible to the frame's draws. A separate one-off stream serves
/// synchronous operations.

use crate::device::{CommandStreamHandle, GraphicsDevice, RenderingInfo, SubmitMode};
use crate::error::Result;
use crate::{engine_debug, engine_protocol_violation};

const SOURCE: &str = "frameline::CommandStreamOrchestrator";

#[derive(Debug, Clone, Copy)]
struct FrameStreams {
    upload: CommandStreamHandle,
    render: CommandStreamHandle,
}

/// Owner of the per-frame command streams and the render-pass state
pub struct CommandStreamOrchestrator {
    frames: Vec<FrameStreams>,
    one_off: CommandStreamHandle,
    slot: usize,
    recording: bool,
    render_pass_open: bool,
    assert_on_violation: bool,
}

impl CommandStreamOrchestrator {
    /// Create the streams of `frames_in_flight` slots plus the one-off stream
    pub fn new(device: &mut dyn GraphicsDevice, frames_in_flight: u32, assert_on_violation: bool) -> Result<Self> {
        let mut orchestrator = Self {
            frames: Vec::new(),
            one_off: CommandStreamHandle::NULL,
            slot: 0,
            recording: false,
            render_pass_open: false,
            assert_on_violation,
        };
        if let Err(e) = orchestrator.create_streams(device, frames_in_flight.max(1)) {
            orchestrator.cleanup(device);
            return Err(e);
        }
        Ok(orchestrator)
    }

    fn create_streams(&mut self, device: &mut dyn GraphicsDevice, frames_in_flight: u32) -> Result<()> {
        for _ in 0..frames_in_flight {
            let upload = device.create_command_stream()?;
            let render = match device.create_command_stream() {
                Ok(render) => render,
                Err(e) => {
                    device.destroy_command_stream(upload);
                    return Err(e);
                }
            };
            self.frames.push(FrameStreams { upload, render });
        }
        self.one_off = device.create_command_stream()?;
        Ok(())
    }

    // ===== FRAME BRACKETING =====

    /// Wait for the slot's previous submission, then open both streams
    pub fn begin_frame(&mut self, device: &mut dyn GraphicsDevice, slot: usize) -> Result<()> {
        let slot = slot % self.frames.len().max(1);
        let Some(streams) = self.frames.get(slot).copied() else {
            return Ok(());
        };
        device.wait_frame(slot)?;
        device.begin_command_stream(streams.upload)?;
        device.begin_command_stream(streams.render)?;
        self.slot = slot;
        self.recording = true;
        Ok(())
    }

    /// Close and submit both streams of the current frame
    pub fn end_frame(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        if !self.recording {
            return Ok(());
        }
        self.end_render_pass_if_needed(device);
        let streams = self.frames[self.slot];
        self.recording = false;

        device.end_command_stream(streams.upload)?;
        device.end_command_stream(streams.render)?;
        device.submit(&[streams.upload], SubmitMode::WaitIdle)?;
        device.submit(&[streams.render], SubmitMode::SignalFrame(self.slot))?;
        Ok(())
    }

    /// Submit everything recorded so far and wait for completion
    ///
    /// Recording resumes on the same streams afterwards. An open render pass
    /// is closed.
    pub fn flush(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        if !self.recording {
            return device.wait_idle();
        }
        if self.end_render_pass_if_needed(device) {
            engine_debug!(SOURCE, "flush closed the open render pass");
        }
        let streams = self.frames[self.slot];
        self.recording = false;

        device.end_command_stream(streams.upload)?;
        device.end_command_stream(streams.render)?;
        device.submit(&[streams.upload], SubmitMode::WaitIdle)?;
        device.submit(&[streams.render], SubmitMode::WaitIdle)?;

        device.begin_command_stream(streams.upload)?;
        device.begin_command_stream(streams.render)?;
        self.recording = true;
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Stream receiving uploads of the current frame
    pub fn upload_stream(&self) -> CommandStreamHandle {
        self.frames.get(self.slot).map(|s| s.upload).unwrap_or(CommandStreamHandle::NULL)
    }

    /// Stream receiving draws, dispatches and readbacks of the current frame
    pub fn render_stream(&self) -> CommandStreamHandle {
        self.frames.get(self.slot).map(|s| s.render).unwrap_or(CommandStreamHandle::NULL)
    }

    // ===== RENDER PASS STATE =====

    pub fn is_render_pass_open(&self) -> bool {
        self.render_pass_open
    }

    /// Open a render pass on the render stream
    ///
    /// A pass without any attachment is a protocol violation and nothing is
    /// recorded. An already open pass is closed first.
    pub fn begin_render_pass(&mut self, device: &mut dyn GraphicsDevice, info: &RenderingInfo) -> bool {
        if !self.check_attachments(info) {
            return false;
        }
        if !self.recording {
            engine_protocol_violation!(self.assert_on_violation, SOURCE, "render pass begun outside a frame");
            return false;
        }
        self.end_render_pass_if_needed(device);
        device.cmd_begin_rendering(self.render_stream(), info);
        self.render_pass_open = true;
        true
    }

    /// Report a pass that has neither color nor depth attachments
    pub fn check_attachments(&self, info: &RenderingInfo) -> bool {
        if info.color_attachments.is_empty() && info.depth_attachment.is_none() {
            engine_protocol_violation!(
                self.assert_on_violation,
                SOURCE,
                "binding a framebuffer without color or depth attachments"
            );
            return false;
        }
        true
    }

    /// Close the open render pass, if any; returns whether one was closed
    pub fn end_render_pass_if_needed(&mut self, device: &mut dyn GraphicsDevice) -> bool {
        if !self.render_pass_open {
            return false;
        }
        device.cmd_end_rendering(self.render_stream());
        self.render_pass_open = false;
        true
    }

    /// Check that `operation` may be recorded outside a render pass
    pub fn require_no_render_pass(&self, operation: &str) -> bool {
        if self.render_pass_open {
            engine_protocol_violation!(
                self.assert_on_violation,
                SOURCE,
                "{} while a render pass is open",
                operation
            );
            return false;
        }
        true
    }

    /// Check that `operation` is recorded inside a render pass
    pub fn require_render_pass(&self, operation: &str) -> bool {
        if !self.render_pass_open {
            engine_protocol_violation!(
                self.assert_on_violation,
                SOURCE,
                "{} without a bound framebuffer",
                operation
            );
            return false;
        }
        true
    }

    // ===== ONE-OFF SUBMISSIONS =====

    /// Begin recording the one-off stream
    pub fn begin_one_off(&mut self, device: &mut dyn GraphicsDevice) -> Result<CommandStreamHandle> {
        device.begin_command_stream(self.one_off)?;
        Ok(self.one_off)
    }

    /// Submit the one-off stream and wait for completion
    pub fn submit_one_off(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        device.end_command_stream(self.one_off)?;
        device.submit(&[self.one_off], SubmitMode::WaitIdle)
    }

    /// Destroy every stream; the device must be idle
    pub fn cleanup(&mut self, device: &mut dyn GraphicsDevice) {
        for streams in self.frames.drain(..) {
            device.destroy_command_stream(streams.upload);
            device.destroy_command_stream(streams.render);
        }
        if !self.one_off.is_null() {
            device.destroy_command_stream(self.one_off);
            self.one_off = CommandStreamHandle::NULL;
        }
        self.recording = false;
        self.render_pass_open = false;
    }
}

#[cfg(test)]
#[path = "command_stream_tests.rs"]
mod tests;
