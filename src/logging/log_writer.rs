use anyhow::Context;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing_subscriber::fmt::MakeWriter;

enum Command {
    Write(usize, Vec<u8>),
    Flush(usize),
    Reopen,
    AddFile(usize, PathBuf, File),
    Shutdown,
}

fn send(sender: &mpsc::Sender<Command>, command: Command) -> io::Result<()> {
    sender
        .try_send(command)
        .map_err(|_| io::Error::other("Failed to send log command"))
}

pub struct Writer<'a> {
    id: usize,
    sender: &'a mpsc::Sender<Command>,
}

impl Write for Writer<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        send(self.sender, Command::Write(self.id, buf.to_vec()))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        send(self.sender, Command::Flush(self.id))
    }
}

pub struct FileWriter {
    id: usize,
    sender: mpsc::Sender<Command>,
}

impl<'a> MakeWriter<'a> for FileWriter {
    type Writer = Writer<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        Writer {
            id: self.id,
            sender: &self.sender,
        }
    }
}

/// Owns the log files; all writes happen on a background task so a slow disk
/// never blocks the caller.
pub struct LogWriter {
    next_id: usize,
    sender: mpsc::Sender<Command>,
    handles: HashMap<PathBuf, File>,
}

impl LogWriter {
    /// Must be called inside a tokio runtime.
    pub fn new() -> (Self, JoinHandle<anyhow::Result<()>>) {
        let (sender, mut commands) = mpsc::channel::<Command>(128);
        let handle = tokio::spawn(async move {
            let mut files: HashMap<usize, (PathBuf, File)> = HashMap::new();
            while let Some(command) = commands.recv().await {
                match command {
                    Command::Write(id, buf) => {
                        let Some((_, file)) = files.get_mut(&id) else {
                            continue;
                        };
                        if let Err(err) = file.write_all(&buf) {
                            eprintln!("Failed to write to log file: {}", err);
                        }
                    }
                    Command::Flush(id) => {
                        let Some((_, file)) = files.get_mut(&id) else {
                            continue;
                        };
                        if let Err(err) = file.flush() {
                            eprintln!("Failed to flush log file: {}", err);
                        }
                    }
                    Command::Reopen => {
                        for (path, file) in files.values_mut() {
                            *file = Self::open(path).inspect_err(|err| {
                                eprintln!("Failed to reopen log file: {}", err)
                            })?;
                        }
                    }
                    Command::AddFile(id, path, file) => {
                        files.insert(id, (path, file));
                    }
                    Command::Shutdown => break,
                }
            }
            for (_, file) in files.values_mut() {
                file.flush().ok();
            }
            Ok::<(), anyhow::Error>(())
        });
        (
            Self {
                next_id: 0,
                sender,
                handles: HashMap::new(),
            },
            handle,
        )
    }

    fn open(path: &Path) -> anyhow::Result<File> {
        OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .with_context(|| format!("Failed to open log file '{path:?}'"))
    }

    pub fn create_file_writer(&mut self, path: impl AsRef<Path>) -> anyhow::Result<FileWriter> {
        let path = path.as_ref().to_path_buf();
        let file = match self.handles.get(&path) {
            Some(file) => file.try_clone()?,
            None => {
                let file = Self::open(&path)?;
                let cloned = file.try_clone()?;
                self.handles.insert(path.clone(), file);
                cloned
            }
        };
        self.next_id += 1;
        send(&self.sender, Command::AddFile(self.next_id, path, file))?;
        Ok(FileWriter {
            id: self.next_id,
            sender: self.sender.clone(),
        })
    }

    /// Reopens every log file, used after log rotation moved them away.
    pub fn reopen(&self) -> anyhow::Result<()> {
        send(&self.sender, Command::Reopen)?;
        Ok(())
    }

    /// Stops the writer task once every queued command has been written.
    /// Waits for room in the queue, so a burst of log lines cannot drop it.
    pub async fn shutdown(&self) {
        if self.sender.send(Command::Shutdown).await.is_err() {
            eprintln!("Failed to stop log writer: writer task already stopped")
        }
    }
}
