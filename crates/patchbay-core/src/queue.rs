//! Streaming sequential data through data-queue ports.
//!
//! Sample and envelope players do not own their data. The host queues
//! [`QueueRequest`]s on the player's queue port; the player pulls one frame
//! at a time on the render thread through [`DataQueue::read_frame`], which
//! walks the requests in order, loops them as asked and fires
//! [`QueueCallback`]s at the boundaries.
//!
//! # Sustain and release loops
//!
//! [`DataQueue::queue_on`] plays the data up to its sustain loop and then
//! loops the sustain region until something else is queued.
//! [`DataQueue::queue_off`] queues the remainder after the sustain loop; the
//! running sustain loop finishes its current pass and hands over.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// Frames of multi-channel values that a player can stream.
pub trait SequentialData: Send + Sync {
    /// Number of frames.
    fn frame_count(&self) -> usize;

    /// Values per frame.
    fn channels(&self) -> usize;

    /// Value of `channel` at `frame`. Both are in range.
    fn read(&self, frame: usize, channel: usize) -> f32;

    /// Playback-rate multiplier for `frame` at the engine's sample rate.
    fn rate_scaler(&self, _frame: usize, _sample_rate: f32) -> f32 {
        1.0
    }

    /// Region looped while a note is held.
    fn sustain_loop(&self) -> Option<LoopRange> {
        None
    }

    /// Region looped after release.
    fn release_loop(&self) -> Option<LoopRange> {
        None
    }
}

/// Half-open frame range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopRange {
    /// First frame of the loop.
    pub start: usize,
    /// One past the last frame.
    pub end: usize,
}

impl LoopRange {
    /// Creates a range.
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    fn is_empty(self) -> bool {
        self.end <= self.start
    }
}

/// Interleaved sample frames recorded at `frame_rate`.
#[derive(Debug, Clone)]
pub struct FloatSample {
    data: Vec<f32>,
    channels: usize,
    frame_rate: f32,
    sustain: Option<LoopRange>,
    release: Option<LoopRange>,
}

impl FloatSample {
    /// Wraps interleaved data. A trailing partial frame is ignored.
    pub fn new(data: Vec<f32>, channels: usize, frame_rate: f32) -> Self {
        Self {
            data,
            channels: channels.max(1),
            frame_rate,
            sustain: None,
            release: None,
        }
    }

    /// Single-channel sample.
    pub fn mono(data: Vec<f32>, frame_rate: f32) -> Self {
        Self::new(data, 1, frame_rate)
    }

    /// Sets the sustain loop.
    pub fn with_sustain_loop(mut self, range: LoopRange) -> Self {
        self.sustain = Some(range);
        self
    }

    /// Sets the release loop.
    pub fn with_release_loop(mut self, range: LoopRange) -> Self {
        self.release = Some(range);
        self
    }

    /// Rate the frames were recorded at.
    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }
}

impl SequentialData for FloatSample {
    fn frame_count(&self) -> usize {
        self.data.len() / self.channels
    }

    fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    fn read(&self, frame: usize, channel: usize) -> f32 {
        self.data[frame * self.channels + channel]
    }

    fn rate_scaler(&self, _frame: usize, sample_rate: f32) -> f32 {
        self.frame_rate / sample_rate
    }

    fn sustain_loop(&self) -> Option<LoopRange> {
        self.sustain
    }

    fn release_loop(&self) -> Option<LoopRange> {
        self.release
    }
}

/// Breakpoint envelope of `(duration seconds, target value)` frames.
///
/// Channel 0 of each frame is the segment duration and channel 1 the value
/// reached at its end.
#[derive(Debug, Clone, Default)]
pub struct SegmentedEnvelope {
    segments: Vec<(f32, f32)>,
    sustain: Option<LoopRange>,
    release: Option<LoopRange>,
}

impl SegmentedEnvelope {
    /// Creates an envelope from `(duration, value)` pairs.
    pub fn new(segments: Vec<(f32, f32)>) -> Self {
        Self {
            segments,
            sustain: None,
            release: None,
        }
    }

    /// Sets the sustain loop, in segments.
    pub fn with_sustain_loop(mut self, range: LoopRange) -> Self {
        self.sustain = Some(range);
        self
    }

    /// Sets the release loop, in segments.
    pub fn with_release_loop(mut self, range: LoopRange) -> Self {
        self.release = Some(range);
        self
    }
}

impl SequentialData for SegmentedEnvelope {
    fn frame_count(&self) -> usize {
        self.segments.len()
    }

    fn channels(&self) -> usize {
        2
    }

    fn read(&self, frame: usize, channel: usize) -> f32 {
        let (duration, value) = self.segments[frame];
        if channel == 0 { duration } else { value }
    }

    fn rate_scaler(&self, frame: usize, sample_rate: f32) -> f32 {
        let duration = self.segments[frame].0;
        1.0 / (duration * sample_rate).max(1.0)
    }

    fn sustain_loop(&self) -> Option<LoopRange> {
        self.sustain
    }

    fn release_loop(&self) -> Option<LoopRange> {
        self.release
    }
}

/// How many passes a request plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loops {
    /// Total number of passes; 0 and 1 both play once.
    Count(u32),
    /// Loop until another request is queued behind this one.
    Forever,
}

/// Boundary reported to a [`QueueCallback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEventKind {
    /// First frame of the request is about to play.
    Started,
    /// A pass completed and another begins.
    Looped,
    /// The request is done.
    Finished,
}

/// Notification delivered on the render thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueEvent {
    /// Which boundary.
    pub kind: QueueEventKind,
    /// Passes completed so far.
    pub passes: u32,
}

/// Receives request boundaries. Runs on the render thread: must not block.
pub trait QueueCallback: Send + Sync {
    /// Called at each boundary.
    fn on_queue_event(&self, event: QueueEvent);
}

impl<F> QueueCallback for F
where
    F: Fn(QueueEvent) + Send + Sync,
{
    fn on_queue_event(&self, event: QueueEvent) {
        self(event);
    }
}

/// A slice of sequential data to play through a queue port.
#[derive(Clone)]
pub struct QueueRequest {
    data: Arc<dyn SequentialData>,
    start: usize,
    frames: usize,
    loops: Loops,
    immediate: bool,
    callback: Option<Arc<dyn QueueCallback>>,
}

impl fmt::Debug for QueueRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueRequest")
            .field("start", &self.start)
            .field("frames", &self.frames)
            .field("loops", &self.loops)
            .field("immediate", &self.immediate)
            .finish_non_exhaustive()
    }
}

impl QueueRequest {
    /// Plays all of `data` once.
    pub fn new(data: Arc<dyn SequentialData>) -> Self {
        let frames = data.frame_count();
        Self {
            data,
            start: 0,
            frames,
            loops: Loops::Count(1),
            immediate: false,
            callback: None,
        }
    }

    /// Restricts playback to `frames` frames from `start`, clipped to the data.
    pub fn range(mut self, start: usize, frames: usize) -> Self {
        let total = self.data.frame_count();
        self.start = start.min(total);
        self.frames = frames.min(total - self.start);
        self
    }

    /// Sets the pass count.
    pub fn loops(mut self, loops: Loops) -> Self {
        self.loops = loops;
        self
    }

    /// Drops everything queued or playing before this request starts.
    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    /// Attaches a boundary callback.
    pub fn callback(mut self, callback: Arc<dyn QueueCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    /// First frame played.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Frames per pass.
    pub fn frames(&self) -> usize {
        self.frames
    }

    fn notify(&self, kind: QueueEventKind, passes: u32) {
        if let Some(cb) = &self.callback {
            cb.on_queue_event(QueueEvent { kind, passes });
        }
    }
}

/// Outcome of [`DataQueue::read_frame`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadStatus {
    /// A frame was read; carries its data frame index and rate multiplier.
    Data {
        /// Frame index within the data.
        frame: usize,
        /// Rate multiplier for that frame.
        rate: f32,
    },
    /// Nothing to play; the last frame was repeated. `first` is set only on
    /// the read where the queue ran dry.
    Starved {
        /// True on the transition into starvation.
        first: bool,
    },
}

struct Active {
    request: QueueRequest,
    cursor: usize,
    passes: u32,
}

/// Request queue and read cursor behind a data-queue port.
pub struct DataQueue {
    channels: usize,
    capacity: usize,
    pending: VecDeque<QueueRequest>,
    active: Option<Active>,
    last: Vec<f32>,
    starved: bool,
}

impl DataQueue {
    /// Queue delivering `channels` values per frame with room for
    /// `capacity` pending requests.
    pub fn new(channels: usize, capacity: usize) -> Self {
        Self {
            channels,
            capacity: capacity.max(1),
            pending: VecDeque::with_capacity(capacity.max(1)),
            active: None,
            last: vec![0.0; channels],
            starved: false,
        }
    }

    /// Values per frame.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// True while a request is playing or waiting.
    pub fn has_data(&self) -> bool {
        self.active.is_some() || !self.pending.is_empty()
    }

    /// Requests waiting behind the active one.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Appends a request. Returns false, dropping it, when the queue is full.
    pub fn push(&mut self, request: QueueRequest) -> bool {
        if request.immediate {
            self.clear();
        }
        if self.pending.len() >= self.capacity {
            #[cfg(feature = "tracing")]
            tracing::warn!(capacity = self.capacity, "data queue full, request dropped");
            return false;
        }
        self.pending.push_back(request);
        true
    }

    /// Drops every pending and playing request without callbacks.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.active = None;
    }

    /// Plays `data` up to and around its sustain loop, replacing anything
    /// queued. Without a sustain loop the release loop is held instead; with
    /// neither the data plays once.
    pub fn queue_on(
        &mut self,
        data: Arc<dyn SequentialData>,
        callback: Option<Arc<dyn QueueCallback>>,
    ) -> bool {
        self.clear();
        let held = data
            .sustain_loop()
            .or_else(|| data.release_loop())
            .filter(|l| !l.is_empty());
        match held {
            Some(l) => {
                self.push_span(&data, 0, l.start, Loops::Count(1), callback.as_ref())
                    && self.push_span(&data, l.start, l.end, Loops::Forever, callback.as_ref())
            }
            None => self.push_span(&data, 0, data.frame_count(), Loops::Count(1), callback.as_ref()),
        }
    }

    /// Queues the part of `data` after its sustain loop. A release loop
    /// behind the sustain loop is then looped; data with no loops queues
    /// nothing.
    pub fn queue_off(
        &mut self,
        data: Arc<dyn SequentialData>,
        callback: Option<Arc<dyn QueueCallback>>,
    ) -> bool {
        let total = data.frame_count();
        let sustain = data.sustain_loop().filter(|l| !l.is_empty());
        let release = data.release_loop().filter(|l| !l.is_empty());
        match (sustain, release) {
            (Some(s), Some(r)) if r.start >= s.end => {
                self.push_span(&data, s.end, r.start, Loops::Count(1), callback.as_ref())
                    && self.push_span(&data, r.start, r.end, Loops::Forever, callback.as_ref())
            }
            (Some(s), _) => self.push_span(&data, s.end, total, Loops::Count(1), callback.as_ref()),
            (None, Some(r)) => self.push_span(&data, r.end, total, Loops::Count(1), callback.as_ref()),
            (None, None) => true,
        }
    }

    fn push_span(
        &mut self,
        data: &Arc<dyn SequentialData>,
        start: usize,
        end: usize,
        loops: Loops,
        callback: Option<&Arc<dyn QueueCallback>>,
    ) -> bool {
        if end <= start {
            return true;
        }
        let mut request = QueueRequest::new(Arc::clone(data))
            .range(start, end - start)
            .loops(loops);
        request.callback = callback.cloned();
        self.push(request)
    }

    /// Last frame delivered (held while starved).
    pub fn last(&self) -> &[f32] {
        &self.last
    }

    /// Reads the next frame into `dest` (at most `channels` values).
    ///
    /// Advances through pending requests and loops as needed. When nothing
    /// is left the previous frame is written again.
    pub fn read_frame(&mut self, dest: &mut [f32], sample_rate: f32) -> ReadStatus {
        loop {
            if self.active.is_none() {
                let Some(request) = self.pending.pop_front() else {
                    dest.iter_mut().zip(&self.last).for_each(|(d, l)| *d = *l);
                    let first = !self.starved;
                    self.starved = true;
                    return ReadStatus::Starved { first };
                };
                request.notify(QueueEventKind::Started, 0);
                self.active = Some(Active {
                    cursor: request.start,
                    request,
                    passes: 0,
                });
            }
            let Some(active) = self.active.as_mut() else {
                continue;
            };
            let req = &active.request;
            if active.cursor < req.start + req.frames {
                let frame = active.cursor;
                let width = self.channels.min(req.data.channels()).min(dest.len());
                for c in 0..width {
                    let v = req.data.read(frame, c);
                    dest[c] = v;
                    self.last[c] = v;
                }
                active.cursor += 1;
                self.starved = false;
                return ReadStatus::Data {
                    frame,
                    rate: req.data.rate_scaler(frame, sample_rate),
                };
            }

            active.passes += 1;
            let again = req.frames > 0
                && match req.loops {
                    Loops::Count(n) => active.passes < n,
                    Loops::Forever => self.pending.is_empty(),
                };
            if again {
                active.cursor = req.start;
                req.notify(QueueEventKind::Looped, active.passes);
            } else {
                req.notify(QueueEventKind::Finished, active.passes);
                self.active = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn ramp(n: usize) -> Arc<dyn SequentialData> {
        Arc::new(FloatSample::mono((0..n).map(|i| i as f32).collect(), 48000.0))
    }

    fn drain(q: &mut DataQueue, n: usize) -> Vec<f32> {
        let mut out = Vec::new();
        let mut frame = [0.0];
        for _ in 0..n {
            q.read_frame(&mut frame, 48000.0);
            out.push(frame[0]);
        }
        out
    }

    #[test]
    fn plays_range_then_holds_last() {
        let mut q = DataQueue::new(1, 4);
        q.push(QueueRequest::new(ramp(10)).range(2, 3));
        assert_eq!(drain(&mut q, 5), [2.0, 3.0, 4.0, 4.0, 4.0]);
        assert!(!q.has_data());
    }

    #[test]
    fn starvation_reported_once() {
        let mut q = DataQueue::new(1, 4);
        let mut f = [0.0];
        assert_eq!(q.read_frame(&mut f, 1.0), ReadStatus::Starved { first: true });
        assert_eq!(q.read_frame(&mut f, 1.0), ReadStatus::Starved { first: false });
        q.push(QueueRequest::new(ramp(1)));
        assert!(matches!(q.read_frame(&mut f, 1.0), ReadStatus::Data { frame: 0, .. }));
        assert_eq!(q.read_frame(&mut f, 1.0), ReadStatus::Starved { first: true });
    }

    #[test]
    fn counted_loops_fire_callbacks() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let cb: Arc<dyn QueueCallback> = Arc::new(move |e: QueueEvent| {
            sink.lock().unwrap().push(e.kind);
        });
        let mut q = DataQueue::new(1, 4);
        q.push(
            QueueRequest::new(ramp(2))
                .loops(Loops::Count(3))
                .callback(cb),
        );
        assert_eq!(drain(&mut q, 7), [0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1.0]);
        assert_eq!(
            *log.lock().unwrap(),
            [
                QueueEventKind::Started,
                QueueEventKind::Looped,
                QueueEventKind::Looped,
                QueueEventKind::Finished
            ]
        );
    }

    #[test]
    fn forever_hands_over_at_pass_boundary() {
        let mut q = DataQueue::new(1, 4);
        q.push(QueueRequest::new(ramp(3)).loops(Loops::Forever));
        assert_eq!(drain(&mut q, 4), [0.0, 1.0, 2.0, 0.0]);
        q.push(QueueRequest::new(ramp(10)).range(7, 2));
        assert_eq!(drain(&mut q, 4), [1.0, 2.0, 7.0, 8.0]);
    }

    #[test]
    fn immediate_replaces_playing() {
        let mut q = DataQueue::new(1, 4);
        q.push(QueueRequest::new(ramp(10)));
        assert_eq!(drain(&mut q, 2), [0.0, 1.0]);
        q.push(QueueRequest::new(ramp(10)).range(5, 1).immediate(true));
        assert_eq!(drain(&mut q, 2), [5.0, 5.0]);
    }

    #[test]
    fn full_queue_rejects() {
        let mut q = DataQueue::new(1, 1);
        assert!(q.push(QueueRequest::new(ramp(1))));
        assert!(!q.push(QueueRequest::new(ramp(1))));
    }

    #[test]
    fn sustain_loop_on_and_off() {
        let data: Arc<dyn SequentialData> = Arc::new(
            FloatSample::mono((0..8).map(|i| i as f32).collect(), 48000.0)
                .with_sustain_loop(LoopRange::new(2, 4)),
        );
        let mut q = DataQueue::new(1, 4);
        q.queue_on(Arc::clone(&data), None);
        assert_eq!(drain(&mut q, 7), [0.0, 1.0, 2.0, 3.0, 2.0, 3.0, 2.0]);
        q.queue_off(data, None);
        assert_eq!(drain(&mut q, 6), [3.0, 4.0, 5.0, 6.0, 7.0, 7.0]);
    }

    #[test]
    fn envelope_rate_is_per_segment() {
        let env = SegmentedEnvelope::new(vec![(0.5, 1.0), (0.0, 0.0)]);
        assert_eq!(env.rate_scaler(0, 100.0), 1.0 / 50.0);
        assert_eq!(env.rate_scaler(1, 100.0), 1.0);
        assert_eq!(env.read(0, 1), 1.0);
    }
}
