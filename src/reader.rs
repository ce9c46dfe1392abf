//! The consumer-facing reader: worker pool, delivery queue and blocking pull.

use std::collections::VecDeque;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use symbolic_common::ByteView;

use crate::columns::Chunk;
use crate::dwarf::{parse_entries, DwarfImage, UnitState};
use crate::error::Error;
use crate::registry::DictRegistry;
use crate::schema::Projection;

/// Configuration for a [`DwarfReader`].
#[derive(Clone, Debug)]
pub struct ReaderOptions {
    /// The columns to materialize, by name and in order, or `None` for the full schema.
    pub columns: Option<Vec<String>>,
    /// The number of decode worker threads. Values below 1 are clamped to 1.
    pub max_parsing_threads: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            columns: None,
            max_parsing_threads: thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }
}

enum Input {
    Path(PathBuf),
    Buffer(ByteView<'static>),
}

struct SharedState {
    units_queue: VecDeque<UnitState>,
    delivery_queue: VecDeque<(Chunk, u64)>,
    units_in_progress: usize,
    is_stopped: bool,
    background_error: Option<Error>,
}

struct Shared {
    state: Mutex<SharedState>,
    /// Signaled when the consumer drains a chunk or stops.
    wake_up_threads: Condvar,
    /// Signaled when a worker publishes a chunk, fails, or the pool stops.
    deliver_chunk: Condvar,
}

/// Everything a worker needs besides the shared queues. Immutable once decoding starts.
struct ReaderCore {
    image: DwarfImage,
    registry: DictRegistry,
    projection: Projection,
}

struct ReaderState {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

fn decode_worker(core: &ReaderCore, shared: &Shared, num_threads: usize) {
    let mut state = shared.state.lock();
    while !state.units_queue.is_empty() && !state.is_stopped {
        if state.delivery_queue.len() > num_threads {
            shared.wake_up_threads.wait(&mut state);
            continue;
        }
        let mut unit = match state.units_queue.pop_front() {
            Some(unit) => unit,
            None => break,
        };
        state.units_in_progress += 1;
        drop(state);

        let offset_before = unit.offset();
        let result = parse_entries(core.image.data(), &core.registry, &core.projection, &mut unit);
        let bytes_consumed = unit.offset() - offset_before;

        state = shared.state.lock();
        state.units_in_progress -= 1;
        match result {
            Ok(chunk) => {
                if chunk.num_rows > 0 {
                    state.delivery_queue.push_back((chunk, bytes_consumed));
                    shared.deliver_chunk.notify_one();
                }
                // Unexhausted units go back to the front so the next pop resumes them.
                if !unit.eof() {
                    state.units_queue.push_front(unit);
                }
            }
            Err(error) => {
                if state.background_error.is_none() {
                    state.background_error = Some(error);
                }
                shared.deliver_chunk.notify_all();
                return;
            }
        }
    }
}

/// Streams the debug entries of an ELF image as columnar chunks.
///
/// Compilation units are decoded by a pool of worker threads; chunks are handed to the consumer
/// through [`next_chunk`](Self::next_chunk) in arbitrary unit interleaving, while chunks of one
/// unit always arrive in offset order. Dropping the reader stops the workers cooperatively.
///
/// # Example
///
/// ```no_run
/// use dwarf_table::{DwarfReader, ReaderOptions};
///
/// fn main() -> Result<(), dwarf_table::Error> {
///     let mut reader = DwarfReader::open("/usr/lib/debug/my-binary", ReaderOptions::default())?;
///     while let Some(chunk) = reader.next_chunk()? {
///         println!("{} rows", chunk.num_rows);
///     }
///     Ok(())
/// }
/// ```
pub struct DwarfReader {
    input: Input,
    registry: DictRegistry,
    projection: Projection,
    num_threads: usize,
    state: Option<ReaderState>,
    approx_bytes_read: u64,
}

impl DwarfReader {
    fn new(input: Input, options: ReaderOptions) -> Result<Self, Error> {
        let projection = match &options.columns {
            Some(names) => Projection::from_names(names)?,
            None => Projection::all(),
        };
        Ok(DwarfReader {
            input,
            registry: DictRegistry::new(),
            projection,
            num_threads: options.max_parsing_threads.max(1),
            state: None,
            approx_bytes_read: 0,
        })
    }

    /// Creates a reader over a local file. The file is memory-mapped when opened.
    pub fn open<P: AsRef<Path>>(path: P, options: ReaderOptions) -> Result<Self, Error> {
        Self::new(Input::Path(path.as_ref().to_path_buf()), options)
    }

    /// Creates a reader over an in-memory buffer.
    pub fn from_vec(data: Vec<u8>, options: ReaderOptions) -> Result<Self, Error> {
        Self::new(Input::Buffer(ByteView::from_vec(data)), options)
    }

    /// Creates a reader over an arbitrary byte source, materializing it in memory.
    pub fn from_read<R: Read>(reader: R, options: ReaderOptions) -> Result<Self, Error> {
        let view = ByteView::read(reader).map_err(Error::io)?;
        Self::new(Input::Buffer(view), options)
    }

    fn initialize(&mut self) -> Result<(), Error> {
        if self.state.is_some() {
            return Ok(());
        }

        let bytes = match &self.input {
            Input::Path(path) => ByteView::open(path).map_err(Error::io)?,
            Input::Buffer(view) => view.clone(),
        };
        tracing::debug!(bytes = bytes.len(), "opening ELF image");
        let image = DwarfImage::parse(bytes)?;
        let units = image.data().unit_states()?;
        tracing::debug!(
            units = units.len(),
            threads = self.num_threads,
            "starting decode workers"
        );

        let shared = Arc::new(Shared {
            state: Mutex::new(SharedState {
                units_queue: units.into(),
                delivery_queue: VecDeque::new(),
                units_in_progress: 0,
                is_stopped: false,
                background_error: None,
            }),
            wake_up_threads: Condvar::new(),
            deliver_chunk: Condvar::new(),
        });
        let core = Arc::new(ReaderCore {
            image,
            registry: self.registry.clone(),
            projection: self.projection.clone(),
        });

        let num_threads = self.num_threads;
        let mut workers = Vec::with_capacity(num_threads);
        for _ in 0..num_threads {
            let core = Arc::clone(&core);
            let worker_shared = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name("dwarf-decoder".into())
                .spawn(move || decode_worker(&core, &worker_shared, num_threads));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(error) => {
                    let mut state = shared.state.lock();
                    state.is_stopped = true;
                    drop(state);
                    shared.wake_up_threads.notify_all();
                    for worker in workers {
                        let _ = worker.join();
                    }
                    return Err(Error::io(error));
                }
            }
        }

        self.state = Some(ReaderState { shared, workers });
        Ok(())
    }

    /// Returns the next chunk, or `None` at the end of the stream.
    ///
    /// The first call opens the image and spawns the workers. Blocks while the delivery queue is
    /// empty and units are still being decoded. A failure observed by any worker is returned
    /// here on the following call; the stream is stopped afterwards.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>, Error> {
        self.initialize()?;
        let shared = match &self.state {
            Some(state) => Arc::clone(&state.shared),
            None => return Ok(None),
        };

        let mut state = shared.state.lock();
        loop {
            if state.is_stopped {
                return Ok(None);
            }
            if let Some(error) = state.background_error.take() {
                state.is_stopped = true;
                drop(state);
                shared.wake_up_threads.notify_all();
                return Err(error);
            }

            if let Some((chunk, bytes_consumed)) = state.delivery_queue.pop_front() {
                self.approx_bytes_read = bytes_consumed;
                drop(state);
                shared.wake_up_threads.notify_one();
                return Ok(Some(chunk));
            }

            if state.units_queue.is_empty() && state.units_in_progress == 0 {
                state.is_stopped = true;
                drop(state);
                shared.wake_up_threads.notify_all();
                return Ok(None);
            }

            shared.deliver_chunk.wait(&mut state);
        }
    }

    /// The approximate number of `.debug_info` bytes consumed for the chunk most recently
    /// returned by [`next_chunk`](Self::next_chunk).
    pub fn approx_bytes_read(&self) -> u64 {
        self.approx_bytes_read
    }

    fn stop_workers(&mut self) {
        if let Some(reader_state) = self.state.as_mut() {
            {
                let mut state = reader_state.shared.state.lock();
                state.is_stopped = true;
            }
            reader_state.shared.wake_up_threads.notify_all();
            for worker in reader_state.workers.drain(..) {
                let _ = worker.join();
            }
        }
    }

    /// Stops the workers and discards all decoding state.
    ///
    /// The next [`next_chunk`](Self::next_chunk) call re-opens the input and starts over.
    pub fn reset(&mut self) {
        self.stop_workers();
        self.state = None;
        self.approx_bytes_read = 0;
    }
}

impl Drop for DwarfReader {
    fn drop(&mut self) {
        self.stop_workers();
    }
}

impl Iterator for DwarfReader {
    type Item = Result<Chunk, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}
