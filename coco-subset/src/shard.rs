//! Sharded record output.

use crate::{common::*, error::ConvertError, example::DetectionExample};

/// A destination that records are appended to.
pub trait ShardSink {
    type Record;

    fn send(&mut self, record: Self::Record) -> Result<()>;

    /// Flush and release the destination.
    fn close(self) -> Result<()>;
}

/// A TFRecord file of `tf.train.Example` records.
pub struct TfRecordSink {
    path: PathBuf,
    writer: ExampleWriter<BufWriter<File>>,
}

impl TfRecordSink {
    pub fn create(path: &Path) -> Result<Self> {
        let writer = ExampleWriter::create(path).map_err(|source| ConvertError::ShardOpen {
            path: path.to_owned(),
            source,
        })?;
        Ok(Self {
            path: path.to_owned(),
            writer,
        })
    }
}

impl ShardSink for TfRecordSink {
    type Record = DetectionExample;

    fn send(&mut self, record: DetectionExample) -> Result<()> {
        let Self { path, writer } = self;
        writer
            .send(record.into_tf_example())
            .map_err(|source| ConvertError::ShardWrite {
                path: path.clone(),
                source,
            })?;
        Ok(())
    }

    fn close(mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("failed to flush '{}'", self.path.display()))?;
        trace!("closed '{}'", self.path.display());
        Ok(())
    }
}

/// The path of the `index`-th shard out of `total` shards.
pub fn shard_path(base_path: &Path, index: usize, total: usize) -> PathBuf {
    let mut path = base_path.as_os_str().to_owned();
    path.push(format!("-{:05}-of-{:05}", index, total));
    path.into()
}

/// The shard receiving the record at `position`.
pub fn shard_index(position: usize, num_shards: NonZeroUsize) -> usize {
    position % num_shards.get()
}

/// Number of records written to each shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardStats {
    pub counts: Vec<usize>,
}

impl ShardStats {
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn min(&self) -> usize {
        self.counts.iter().copied().min().unwrap_or(0)
    }

    pub fn max(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

/// A set of open shards.
///
/// Sinks are released in reverse opening order, each exactly once, either by
/// [ShardSet::close] or when the set is dropped on an error path.
#[derive(Debug)]
pub struct ShardSet<S>
where
    S: ShardSink,
{
    base_path: PathBuf,
    num_shards: NonZeroUsize,
    sinks: Vec<S>,
}

impl ShardSet<TfRecordSink> {
    pub fn create(base_path: impl AsRef<Path>, num_shards: NonZeroUsize) -> Result<Self> {
        Self::open_with(base_path, num_shards, TfRecordSink::create)
    }
}

impl<S> ShardSet<S>
where
    S: ShardSink,
{
    /// Open `num_shards` sinks named after `base_path`.
    ///
    /// If any sink fails to open, the ones opened before it are closed before
    /// the error is returned.
    pub fn open_with<F>(
        base_path: impl AsRef<Path>,
        num_shards: NonZeroUsize,
        mut opener: F,
    ) -> Result<Self>
    where
        F: FnMut(&Path) -> Result<S>,
    {
        let base_path = base_path.as_ref().to_owned();
        let total = num_shards.get();
        let mut shards = Self {
            base_path,
            num_shards,
            sinks: Vec::with_capacity(total),
        };

        for index in 0..total {
            let path = shard_path(&shards.base_path, index, total);
            let sink = opener(&path)
                .with_context(|| format!("failed to open shard file '{}'", path.display()))?;
            shards.sinks.push(sink);
        }

        debug!(
            "opened {} shards at '{}'",
            total,
            shards.base_path.display()
        );
        Ok(shards)
    }

    /// Distribute records over the shards in round-robin order.
    ///
    /// The first failed record stops the writing and its error is returned.
    pub fn write_all<I>(&mut self, records: I) -> Result<ShardStats>
    where
        I: IntoIterator<Item = Result<S::Record>>,
    {
        let mut counts = vec![0; self.num_shards.get()];

        for (position, record) in records.into_iter().enumerate() {
            let record = record?;
            let index = shard_index(position, self.num_shards);
            self.sinks[index]
                .send(record)
                .with_context(|| format!("failed to write record {} to shard {}", position, index))?;
            counts[index] += 1;
        }

        Ok(ShardStats { counts })
    }

    /// Close all shards and report the first failure.
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        let mut first_error = None;

        for (index, sink) in self.sinks.drain(..).enumerate().rev() {
            if let Err(err) = sink.close() {
                let err = err.context(format!("failed to close shard {}", index));
                if first_error.is_none() {
                    first_error = Some(err);
                } else {
                    warn!("{:#}", err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<S> Drop for ShardSet<S>
where
    S: ShardSink,
{
    fn drop(&mut self) {
        if self.sinks.is_empty() {
            return;
        }
        warn!(
            "releasing {} unclosed shards at '{}'",
            self.sinks.len(),
            self.base_path.display()
        );
        if let Err(err) = self.release() {
            warn!("{:#}", err);
        }
    }
}
