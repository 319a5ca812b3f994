use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::debug::{counts_json, json_escape};

// Totals go to a sibling `*_hot.log` when the last clone is dropped.
#[derive(Clone)]
pub(crate) struct PerfLogger {
    inner: Arc<Mutex<PerfState>>,
}

#[derive(Default)]
struct SpanTotal {
    ms: f64,
    count: u64,
}

struct PerfState {
    writer: BufWriter<File>,
    path: PathBuf,
    spans: HashMap<String, SpanTotal>,
    counts: HashMap<String, u64>,
}

impl PerfLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(PerfState {
                writer: BufWriter::new(file),
                path,
                spans: HashMap::new(),
                counts: HashMap::new(),
            })),
        })
    }

    pub fn log_span_ms(&self, name: &str, ms: f64) {
        if let Ok(mut state) = self.inner.lock() {
            let total = state.spans.entry(name.to_string()).or_default();
            total.ms += ms;
            total.count = total.count.saturating_add(1);
            let _ = writeln!(
                state.writer,
                "{{\"type\":\"perf.span\",\"name\":\"{}\",\"unit\":\"ms\",\"ms\":{:.3}}}",
                json_escape(name),
                ms
            );
        }
    }

    pub fn log_counts(&self, name: &str, counts: &[(&str, u64)]) {
        if let Ok(mut state) = self.inner.lock() {
            for (key, value) in counts {
                let entry = state.counts.entry(format!("{name}.{key}")).or_insert(0);
                *entry = entry.saturating_add(*value);
            }
            let _ = writeln!(
                state.writer,
                "{{\"type\":\"perf.counts\",\"name\":\"{}\",\"counts\":{}}}",
                json_escape(name),
                counts_json(counts)
            );
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = state.writer.flush();
        }
    }
}

impl Drop for PerfState {
    fn drop(&mut self) {
        let _ = self.writer.flush();
        let Ok(file) = File::create(hot_path_for(&self.path)) else {
            return;
        };
        let mut writer = BufWriter::new(file);

        let mut spans: Vec<(&String, &SpanTotal)> = self.spans.iter().collect();
        spans.sort_by(|a, b| b.1.ms.total_cmp(&a.1.ms).then_with(|| a.0.cmp(b.0)));
        for (rank, (name, total)) in spans.into_iter().enumerate() {
            let avg = total.ms / total.count.max(1) as f64;
            let _ = writeln!(
                writer,
                "{{\"type\":\"perf.hot.span\",\"rank\":{},\"name\":\"{}\",\"unit\":\"ms\",\"ms\":{:.3},\"count\":{},\"avg_ms\":{:.3}}}",
                rank + 1,
                json_escape(name),
                total.ms,
                total.count,
                avg
            );
        }

        let mut counts: Vec<(&String, &u64)> = self.counts.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (rank, (name, value)) in counts.into_iter().enumerate() {
            let _ = writeln!(
                writer,
                "{{\"type\":\"perf.hot.count\",\"rank\":{},\"name\":\"{}\",\"value\":{}}}",
                rank + 1,
                json_escape(name),
                value
            );
        }
    }
}

fn hot_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("svgcanvas_perf.log");
    let stem = file_name
        .rsplit_once('.')
        .map(|(s, _)| s)
        .unwrap_or(file_name);
    path.with_file_name(format!("{stem}_hot.log"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn hot_log_sits_next_to_the_perf_log() {
        assert_eq!(
            hot_path_for(Path::new("/tmp/run.perf.log")),
            PathBuf::from("/tmp/run.perf_hot.log")
        );
        assert_eq!(
            hot_path_for(Path::new("/tmp/perf")),
            PathBuf::from("/tmp/perf_hot.log")
        );
    }

    #[test]
    fn drop_writes_aggregates() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("svgcanvas_perf_{nanos}.log"));
        {
            let logger = PerfLogger::new(&path).unwrap();
            let clone = logger.clone();
            logger.log_span_ms("scene.serialize", 1.5);
            clone.log_counts("finish", &[("shapes", 3), ("groups", 1)]);
            clone.log_counts("finish", &[("shapes", 2), ("groups", 1)]);
        }
        let log = std::fs::read_to_string(&path).unwrap();
        assert!(log.lines().next().unwrap().starts_with(
            "{\"type\":\"perf.span\",\"name\":\"scene.serialize\",\"unit\":\"ms\""
        ));
        assert!(log.contains("{\"type\":\"perf.counts\",\"name\":\"finish\",\"counts\":{\"shapes\":3,\"groups\":1}}"));

        let hot_path = hot_path_for(&path);
        let hot = std::fs::read_to_string(&hot_path).unwrap();
        assert!(hot.contains("\"name\":\"finish.shapes\",\"value\":5"));
        assert!(hot.contains("\"name\":\"scene.serialize\""));
        let _ = std::fs::remove_file(path);
        let _ = std::fs::remove_file(hot_path);
    }
}
