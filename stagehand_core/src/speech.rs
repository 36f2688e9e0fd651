use serde::{Deserialize, Serialize};

use crate::providers::{AudioHandle, SpeechAudio};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpeechHandle(pub u32);

/// Everything needed to start one spoken line. `speaker` of `None` is
/// narration; narration shares a single speaker slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub speaker: Option<String>,
    pub text: String,
    pub cue: Option<String>,
    pub background: bool,
    pub prevent_skip: bool,
    /// Minimum display time in scheduler ticks.
    pub ticks: u32,
}

impl SpeechRequest {
    pub fn new(speaker: Option<String>, text: impl Into<String>) -> Self {
        SpeechRequest {
            speaker,
            text: text.into(),
            cue: None,
            background: false,
            prevent_skip: false,
            ticks: 24,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpeechLine {
    handle: SpeechHandle,
    speaker: Option<String>,
    text: String,
    audio: Option<AudioHandle>,
    background: bool,
    prevent_skip: bool,
    remaining: u32,
}

impl SpeechLine {
    pub fn handle(&self) -> SpeechHandle {
        self.handle
    }

    pub fn speaker(&self) -> Option<&str> {
        self.speaker.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_background(&self) -> bool {
        self.background
    }
}

pub(crate) fn speaker_label(speaker: &Option<String>) -> &str {
    speaker.as_deref().unwrap_or("narrator")
}

/// Ordered collection of concurrently alive speech lines. Enforces at most
/// one alive line per speaker: starting a new line for an already-speaking
/// entity ends the old one first, audio included.
#[derive(Default)]
pub struct SpeechRuntime {
    lines: Vec<SpeechLine>,
    next_handle: u32,
}

impl SpeechRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a line, tearing down any live line from the same speaker first.
    /// Returns the new handle plus journal messages for the teardown/start.
    pub fn start_line(
        &mut self,
        request: SpeechRequest,
        audio: &mut dyn SpeechAudio,
    ) -> (SpeechHandle, Vec<String>) {
        let mut messages = Vec::new();
        while let Some(index) = self
            .lines
            .iter()
            .position(|line| line.speaker == request.speaker)
        {
            let line = self.lines.remove(index);
            if let Some(handle) = line.audio {
                audio.stop(handle);
            }
            messages.push(format!(
                "speech.replace {} {}",
                speaker_label(&line.speaker),
                line.text
            ));
        }

        self.next_handle += 1;
        let handle = SpeechHandle(self.next_handle);
        let audio_handle = request
            .cue
            .as_deref()
            .and_then(|cue| audio.start_line(cue, request.speaker.as_deref()));
        messages.push(format!(
            "speech.begin {} {}",
            speaker_label(&request.speaker),
            request.text
        ));
        self.lines.push(SpeechLine {
            handle,
            speaker: request.speaker,
            text: request.text,
            audio: audio_handle,
            background: request.background,
            prevent_skip: request.prevent_skip,
            remaining: request.ticks,
        });
        (handle, messages)
    }

    /// Per-frame update: counts down display time, polls audio, and tears
    /// down finished lines in list order. Removal is one-at-a-time with a
    /// scan restart after each, so indices never go stale mid-pass.
    pub fn advance(&mut self, audio: &mut dyn SpeechAudio) -> Vec<String> {
        let mut messages = Vec::new();
        for line in &mut self.lines {
            line.remaining = line.remaining.saturating_sub(1);
            if let Some(handle) = line.audio {
                if !audio.is_playing(handle) {
                    line.audio = None;
                }
            }
        }
        loop {
            let finished = self
                .lines
                .iter()
                .position(|line| line.remaining == 0 && line.audio.is_none());
            match finished {
                Some(index) => {
                    let line = self.lines.remove(index);
                    messages.push(format!(
                        "speech.end {} {}",
                        speaker_label(&line.speaker),
                        line.text
                    ));
                }
                None => break,
            }
        }
        messages
    }

    /// Bulk-terminates lines, optionally filtered by backgroundness. Returns
    /// whether any line was affected so callers can force-hide subtitle UI.
    pub fn kill_all(
        &mut self,
        background: Option<bool>,
        audio: &mut dyn SpeechAudio,
    ) -> (bool, Vec<String>) {
        self.kill_matching(audio, |line| {
            background.map_or(true, |flag| line.background == flag)
        })
    }

    pub fn kill_for_speaker(
        &mut self,
        speaker: Option<&str>,
        audio: &mut dyn SpeechAudio,
    ) -> (bool, Vec<String>) {
        self.kill_matching(audio, |line| line.speaker.as_deref() == speaker)
    }

    /// Skip input: tears down every skippable line.
    pub fn skip(&mut self, audio: &mut dyn SpeechAudio) -> (bool, Vec<String>) {
        self.kill_matching(audio, |line| !line.prevent_skip)
    }

    fn kill_matching(
        &mut self,
        audio: &mut dyn SpeechAudio,
        matches: impl Fn(&SpeechLine) -> bool,
    ) -> (bool, Vec<String>) {
        let mut messages = Vec::new();
        loop {
            let Some(index) = self.lines.iter().position(&matches) else {
                break;
            };
            let line = self.lines.remove(index);
            if let Some(handle) = line.audio {
                audio.stop(handle);
            }
            messages.push(format!(
                "speech.kill {} {}",
                speaker_label(&line.speaker),
                line.text
            ));
        }
        (!messages.is_empty(), messages)
    }

    pub fn lines(&self) -> &[SpeechLine] {
        &self.lines
    }

    pub fn is_speaking(&self, speaker: &str) -> bool {
        self.lines
            .iter()
            .any(|line| line.speaker.as_deref() == Some(speaker))
    }

    /// Speaker of the most recently started alive line (`None` when nothing
    /// is alive or the latest line is narration).
    pub fn latest_speaker(&self) -> Option<&str> {
        self.lines.last().and_then(|line| line.speaker.as_deref())
    }

    pub fn alive_count_for(&self, speaker: Option<&str>) -> usize {
        self.lines
            .iter()
            .filter(|line| line.speaker.as_deref() == speaker)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::fakes::FakeAudio;

    fn quick(speaker: Option<&str>, text: &str) -> SpeechRequest {
        let mut request = SpeechRequest::new(speaker.map(|value| value.to_string()), text);
        request.ticks = 2;
        request
    }

    #[test]
    fn at_most_one_live_line_per_speaker() {
        let mut speech = SpeechRuntime::new();
        let mut audio = FakeAudio::default();
        speech.start_line(quick(Some("manny"), "Hello"), &mut audio);
        let (_, messages) = speech.start_line(quick(Some("manny"), "Goodbye"), &mut audio);
        assert_eq!(speech.alive_count_for(Some("manny")), 1);
        assert_eq!(speech.lines()[0].text(), "Goodbye");
        assert!(messages
            .iter()
            .any(|line| line == "speech.replace manny Hello"));
    }

    #[test]
    fn narration_shares_one_speaker_slot() {
        let mut speech = SpeechRuntime::new();
        let mut audio = FakeAudio::default();
        speech.start_line(quick(None, "It was quiet."), &mut audio);
        speech.start_line(quick(None, "Too quiet."), &mut audio);
        assert_eq!(speech.alive_count_for(None), 1);
        assert_eq!(speech.lines()[0].text(), "Too quiet.");
    }

    #[test]
    fn different_speakers_run_concurrently() {
        let mut speech = SpeechRuntime::new();
        let mut audio = FakeAudio::default();
        speech.start_line(quick(Some("manny"), "One"), &mut audio);
        speech.start_line(quick(Some("clerk"), "Two"), &mut audio);
        assert_eq!(speech.lines().len(), 2);
        assert_eq!(speech.latest_speaker(), Some("clerk"));
    }

    #[test]
    fn advance_tears_down_expired_lines_in_order() {
        let mut speech = SpeechRuntime::new();
        let mut audio = FakeAudio::default();
        speech.start_line(quick(Some("a"), "first"), &mut audio);
        speech.start_line(quick(Some("b"), "second"), &mut audio);
        assert!(speech.advance(&mut audio).is_empty());
        let messages = speech.advance(&mut audio);
        assert_eq!(
            messages,
            vec!["speech.end a first", "speech.end b second"]
        );
        assert!(speech.lines().is_empty());
    }

    #[test]
    fn line_with_audio_waits_for_playback() {
        let mut speech = SpeechRuntime::new();
        let mut audio = FakeAudio::default();
        let mut request = quick(Some("manny"), "cued");
        request.cue = Some("moma112".to_string());
        speech.start_line(request, &mut audio);
        // display ticks elapse but the cue is still playing
        speech.advance(&mut audio);
        speech.advance(&mut audio);
        assert_eq!(speech.lines().len(), 1);
        audio.finish(AudioHandle(1));
        let messages = speech.advance(&mut audio);
        assert_eq!(messages, vec!["speech.end manny cued"]);
    }

    #[test]
    fn kill_all_reports_whether_anything_died() {
        let mut speech = SpeechRuntime::new();
        let mut audio = FakeAudio::default();
        let (affected, _) = speech.kill_all(None, &mut audio);
        assert!(!affected);
        let mut request = quick(Some("manny"), "bg");
        request.background = true;
        speech.start_line(request, &mut audio);
        speech.start_line(quick(Some("clerk"), "fg"), &mut audio);
        let (affected, _) = speech.kill_all(Some(true), &mut audio);
        assert!(affected);
        assert_eq!(speech.lines().len(), 1);
        assert_eq!(speech.lines()[0].speaker(), Some("clerk"));
    }

    #[test]
    fn kill_for_speaker_only_silences_that_speaker() {
        let mut speech = SpeechRuntime::new();
        let mut audio = FakeAudio::default();
        let mut request = quick(Some("manny"), "cued");
        request.cue = Some("moma112".to_string());
        speech.start_line(request, &mut audio);
        speech.start_line(quick(Some("clerk"), "kept"), &mut audio);
        speech.start_line(quick(None, "narration kept"), &mut audio);

        let (affected, messages) = speech.kill_for_speaker(Some("manny"), &mut audio);
        assert!(affected);
        assert_eq!(messages, vec!["speech.kill manny cued"]);
        // the cued playback is torn down with the line
        assert!(!audio.stopped.is_empty());
        assert_eq!(speech.lines().len(), 2);
        assert_eq!(speech.alive_count_for(Some("manny")), 0);

        // the narration slot is a speaker like any other
        let (affected, _) = speech.kill_for_speaker(None, &mut audio);
        assert!(affected);
        assert_eq!(speech.lines().len(), 1);
        assert_eq!(speech.lines()[0].speaker(), Some("clerk"));

        let (affected, messages) = speech.kill_for_speaker(Some("manny"), &mut audio);
        assert!(!affected);
        assert!(messages.is_empty());
    }

    #[test]
    fn skip_spares_prevent_skip_lines() {
        let mut speech = SpeechRuntime::new();
        let mut audio = FakeAudio::default();
        let mut request = quick(Some("manny"), "important");
        request.prevent_skip = true;
        speech.start_line(request, &mut audio);
        speech.start_line(quick(Some("clerk"), "filler"), &mut audio);
        let (affected, _) = speech.skip(&mut audio);
        assert!(affected);
        assert_eq!(speech.lines().len(), 1);
        assert_eq!(speech.lines()[0].text(), "important");
    }
}
