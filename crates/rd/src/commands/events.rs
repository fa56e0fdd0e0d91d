use clap::Args;
use rd_core::error::RedirectorError;
use rd_core::events::EventRepository;
use rd_core::ids::IdSelection;
use rd_core::store::Store;
use rd_core::tail::{self, TailOptions};
use rd_core::types::{Event, EventFilter, StatsKey};
use rd_core::Admin;
use rd_db::DbStore;
use std::fs::File;
use std::future::Future;
use std::io::{BufWriter, Write};

use crate::config::Config;
use crate::error::Result;
use crate::output;

/// Substring and time-bound selection shared by `ls` and `export`.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Substring search in path/headers/client_ip
    #[arg(long)]
    pub contains: Option<String>,
    /// ISO time lower bound (e.g. 2025-11-09T00:00:00Z)
    #[arg(long)]
    pub since: Option<String>,
    /// ISO time upper bound
    #[arg(long)]
    pub until: Option<String>,
}

impl FilterArgs {
    fn into_filter(self, limit: Option<u32>) -> EventFilter {
        EventFilter {
            contains: self.contains,
            since: self.since,
            until: self.until,
            limit,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub filter: FilterArgs,
    /// Max rows. Omit or pass 0 for no limit
    #[arg(long)]
    pub limit: Option<u32>,
    /// Output JSON summaries instead of tuple lines
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct IdArgs {
    /// 'latest' or numeric id(s); ranges like 1-6 allowed
    #[arg(required = true)]
    pub ids: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Path or "-" for stdout
    #[arg(long)]
    pub csv: String,
    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Args, Debug, Clone)]
pub struct TailArgs {
    /// Poll interval in seconds
    #[arg(long, default_value_t = 1.0)]
    pub interval: f64,
    /// Start after this id instead of the current newest event
    #[arg(long)]
    pub after: Option<i64>,
}

#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    /// client_ip|method|path
    #[arg(long, default_value = "client_ip")]
    pub by: String,
    /// Rows shown; 0 shows every group
    #[arg(long, default_value_t = 20)]
    pub limit: u32,
}

pub fn list<S: Store>(admin: &Admin<S>, args: ListArgs, out: &mut impl Write) -> Result<()> {
    let filter = args.filter.into_filter(args.limit);
    let events = admin.events().list(&filter)?;
    if args.json {
        output::write_summaries(out, &events)
    } else {
        output::write_lines(out, &events)
    }
}

pub fn show<S: Store>(admin: &Admin<S>, selection: &IdSelection, out: &mut impl Write) -> Result<()> {
    let shown = admin.events().show(selection)?;
    output::write_shown(out, &shown)
}

pub fn delete<S: Store>(
    admin: &Admin<S>,
    selection: &IdSelection,
    out: &mut impl Write,
) -> Result<()> {
    let deleted = admin.events().delete(selection)?;
    output::write_deleted(out, &deleted)
}

pub fn export<S: Store>(admin: &Admin<S>, args: ExportArgs, out: &mut impl Write) -> Result<()> {
    let events = admin.events().export(&args.filter.into_filter(None))?;
    if args.csv == "-" {
        output::write_csv(&mut *out, &events)?;
        return Ok(());
    }
    let file = BufWriter::new(File::create(&args.csv)?);
    let rows = output::write_csv(file, &events)?;
    writeln!(out, "Wrote {rows} rows to {}", args.csv)?;
    Ok(())
}

pub fn stats<S: Store>(
    admin: &Admin<S>,
    key: StatsKey,
    limit: u32,
    out: &mut impl Write,
) -> Result<()> {
    let rows = admin.events().stats(key, Some(limit))?;
    output::write_stats(out, &rows)
}

/// Streams new events as tuple lines until Ctrl+C.
pub async fn tail(config: &Config, args: TailArgs) -> Result<()> {
    let open = || DbStore::open(&config.db_path, config.busy_timeout);
    let start = match args.after {
        Some(after) => after,
        None => open()?.events().max_id()?,
    };
    let options = TailOptions {
        after: Some(start),
        ..TailOptions::default()
    }
    .with_interval_secs(args.interval);
    eprintln!("[tail] starting at id>{start} (Ctrl+C to stop)");

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    let watermark = stream_lines(open, options, std::io::stdout(), shutdown).await?;
    eprintln!("[tail] stopped at id>{watermark}");
    Ok(())
}

/// Follows the store, writing each batch to `out` as tuple lines.
///
/// A write failure stops the stream and comes back as `CliError::Io`, so a
/// closed pipe is reported like it is for every other command.
async fn stream_lines<O, W, C>(
    open: O,
    options: TailOptions,
    mut out: W,
    shutdown: C,
) -> Result<i64>
where
    O: Fn() -> std::result::Result<DbStore, RedirectorError>,
    W: Write,
    C: Future<Output = ()>,
{
    let mut write_error: Option<std::io::Error> = None;
    let on_batch = |events: &[Event]| {
        events
            .iter()
            .try_for_each(|event| writeln!(out, "{}", output::event_line(event)))
            .and_then(|()| out.flush())
            .map_err(|err| {
                let message = format!("writing tail output: {err}");
                write_error = Some(err);
                RedirectorError::Internal { message }
            })
    };

    let followed = tail::follow(open, options, on_batch, shutdown).await;
    if let Some(err) = write_error {
        return Err(err.into());
    }
    Ok(followed?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rd_core::ids;
    use rd_core::types::{Headers, NewEvent};
    use rd_db::schema;
    use std::time::Duration;

    fn admin_with(paths: &[&str]) -> Admin<DbStore> {
        let admin = Admin::new(DbStore::new(schema::with_test_db().unwrap()));
        for (minute, path) in paths.iter().enumerate() {
            let event = NewEvent::new("GET", *path)
                .at(Utc.with_ymd_and_hms(2025, 1, 1, 0, minute as u32, 0).unwrap())
                .headers(Headers::from_pairs([("User-Agent", "test")]))
                .client_ip("203.0.113.5");
            admin.events().append(event).unwrap();
        }
        admin
    }

    fn text(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn list_prints_newest_first() {
        let admin = admin_with(&["/a", "/b", "/c"]);
        let mut buf = Vec::new();
        let args = ListArgs {
            filter: FilterArgs::default(),
            limit: Some(2),
            json: false,
        };
        list(&admin, args, &mut buf).unwrap();
        let out = text(buf);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("(3, "));
        assert!(lines[1].starts_with("(2, "));
    }

    #[test]
    fn delete_latest_prints_envelope() {
        let admin = admin_with(&["/a", "/b"]);
        let mut buf = Vec::new();
        let selection = ids::resolve(&["latest"]).unwrap();
        delete(&admin, &selection, &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text(buf)).unwrap();
        assert_eq!(value["deleted"].as_array().unwrap().len(), 1);
        assert_eq!(value["deleted"][0]["id"], 2);
        assert_eq!(admin.events().max_id().unwrap(), 1);
    }

    #[test]
    fn export_to_file_reports_count() {
        let admin = admin_with(&["/a", "/b", "/c"]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.csv");
        let mut buf = Vec::new();
        let args = ExportArgs {
            csv: path.to_str().unwrap().to_string(),
            filter: FilterArgs {
                contains: Some("/b".into()),
                ..FilterArgs::default()
            },
        };
        export(&admin, args, &mut buf).unwrap();
        assert!(text(buf).starts_with("Wrote 1 rows to "));
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 2);
        assert!(written.lines().nth(1).unwrap().contains("/b"));
    }

    #[test]
    fn export_to_stdout_writes_csv() {
        let admin = admin_with(&["/a"]);
        let mut buf = Vec::new();
        let args = ExportArgs {
            csv: "-".into(),
            filter: FilterArgs::default(),
        };
        export(&admin, args, &mut buf).unwrap();
        assert!(text(buf).starts_with("id,ts,method,path,query,headers,body,client_ip\n"));
    }

    #[test]
    fn stats_groups_by_path() {
        let admin = admin_with(&["/a", "/b", "/a"]);
        let mut buf = Vec::new();
        stats(&admin, StatsKey::Path, 20, &mut buf).unwrap();
        assert_eq!(text(buf), "     2  /a\n     1  /b\n");
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn file_db(dir: &tempfile::TempDir, routes: &[&str]) -> String {
        let path = dir.path().join("events.db").to_str().unwrap().to_string();
        let admin = Admin::new(DbStore::open(&path, schema::DEFAULT_BUSY_TIMEOUT).unwrap());
        for route in routes {
            admin.events().append(NewEvent::new("GET", *route)).unwrap();
        }
        path
    }

    fn from_start() -> TailOptions {
        TailOptions {
            interval: Duration::from_millis(10),
            after: Some(0),
        }
    }

    #[tokio::test]
    async fn stream_writes_tuple_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = file_db(&dir, &["/a", "/b"]);
        let open = || DbStore::open(&path, schema::DEFAULT_BUSY_TIMEOUT);
        let mut buf = Vec::new();

        let watermark = stream_lines(
            open,
            from_start(),
            &mut buf,
            tokio::time::sleep(Duration::from_millis(150)),
        )
        .await
        .unwrap();

        assert_eq!(watermark, 2);
        let out = text(buf);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("(1, "));
        assert!(lines[1].starts_with("(2, "));
    }

    #[tokio::test]
    async fn closed_stdout_ends_stream_as_broken_pipe() {
        let dir = tempfile::tempdir().unwrap();
        let path = file_db(&dir, &["/a"]);
        let open = || DbStore::open(&path, schema::DEFAULT_BUSY_TIMEOUT);

        let err = stream_lines(open, from_start(), ClosedPipe, std::future::pending::<()>())
            .await
            .unwrap_err();

        assert!(err.is_broken_pipe());
    }
}
