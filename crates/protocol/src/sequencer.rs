use crate::frame::StreamFragment;

/// Frames one exchange's output.
///
/// Non-terminal frames are produced until the first call to [`finish`] or
/// [`fail`]; that call yields the single terminal frame and every later call
/// yields `None`. The text of every non-terminal frame recorded as sent is
/// accumulated for persistence.
///
/// [`finish`]: FrameSequencer::finish
/// [`fail`]: FrameSequencer::fail
#[derive(Debug)]
pub struct FrameSequencer {
    message_id: String,
    accumulated: String,
    sent: usize,
    closed: bool,
}

impl FrameSequencer {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            accumulated: String::new(),
            sent: 0,
            closed: false,
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Frame one fragment and record it as sent. Empty fragments and
    /// fragments after the terminal frame produce nothing.
    pub fn fragment(&mut self, text: &str) -> Option<StreamFragment> {
        let frame = self.frame(text)?;
        self.confirm(text);
        Some(frame)
    }

    /// Frame one fragment without recording it. Call [`confirm`] once the
    /// frame was accepted for delivery.
    ///
    /// [`confirm`]: FrameSequencer::confirm
    pub fn frame(&self, text: &str) -> Option<StreamFragment> {
        (!self.closed && !text.is_empty())
            .then(|| StreamFragment::partial(&self.message_id, text))
    }

    pub fn confirm(&mut self, text: &str) {
        self.accumulated.push_str(text);
        self.sent += 1;
    }

    pub fn finish(&mut self) -> Option<StreamFragment> {
        self.close().then(|| StreamFragment::terminal(&self.message_id))
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Option<StreamFragment> {
        let error = error.into();
        self.close()
            .then(|| StreamFragment::failed(&self.message_id, error))
    }

    /// Text of all non-terminal frames recorded as sent so far.
    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    pub fn fragments_sent(&self) -> usize {
        self.sent
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn into_text(self) -> String {
        self.accumulated
    }

    fn close(&mut self) -> bool {
        !std::mem::replace(&mut self.closed, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_terminal_frame() {
        let mut seq = FrameSequencer::new("m");
        assert!(seq.fragment("a").is_some());
        assert!(seq.finish().is_some());
        assert!(seq.finish().is_none());
        assert!(seq.fail("late").is_none());
        assert!(seq.fragment("b").is_none());
        assert_eq!(seq.accumulated(), "a");
    }

    #[test]
    fn failure_keeps_sent_text_only() {
        let mut seq = FrameSequencer::new("m");
        seq.fragment("par");
        seq.fragment("tial");
        let term = seq.fail("upstream died").unwrap();
        assert!(term.done);
        assert_eq!(term.error.as_deref(), Some("upstream died"));
        assert_eq!(seq.fragments_sent(), 2);
        assert_eq!(seq.into_text(), "partial");
    }

    #[test]
    fn unconfirmed_frames_are_not_accumulated() {
        let mut seq = FrameSequencer::new("m");
        seq.fragment("kept");
        let frame = seq.frame(" dropped").unwrap();
        assert_eq!(frame.content, " dropped");
        assert_eq!(seq.accumulated(), "kept");
        assert_eq!(seq.fragments_sent(), 1);
    }

    #[test]
    fn empty_fragments_are_not_framed() {
        let mut seq = FrameSequencer::new("m");
        assert!(seq.fragment("").is_none());
        assert_eq!(seq.fragments_sent(), 0);
        let term = seq.finish().unwrap();
        assert_eq!(term.metadata.message_id.as_deref(), Some("m"));
        assert!(term.content.is_empty());
    }
}
