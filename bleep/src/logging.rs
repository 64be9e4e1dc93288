use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use log::{Level, Log, Metadata, Record};

/// One of the six `logs/*.txt` categories. A record's target prefix picks the category;
/// anything unmatched (or anything at `debug`/`trace`) also goes to `debug.txt`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Category {
    General,
    Debug,
    Enum,
    User,
    Agent,
    Database,
}

impl Category {
    fn file_name(self) -> &'static str {
        match self {
            Category::General => "general.txt",
            Category::Debug => "debug.txt",
            Category::Enum => "enum.txt",
            Category::User => "user.txt",
            Category::Agent => "agent.txt",
            Category::Database => "database.txt",
        }
    }

    fn for_target(target: &str) -> Self {
        if target.starts_with("bleep_agent") {
            Category::Agent
        } else if target.starts_with("bleep_store") {
            Category::Database
        } else if target.starts_with("bleep_async") || target.starts_with("bleep_classic") {
            Category::Enum
        } else if target.starts_with("bleep::modes") || target.starts_with("bleep::ble_ctf") {
            Category::User
        } else {
            Category::General
        }
    }
}

/// Tees every log record to both stderr, via a `pretty_env_logger`-built formatter held
/// internally (rather than installed globally, since only one logger can ever be installed),
/// and to a per-category file under `logs/`, since `pretty_env_logger` alone only writes to
/// stderr.
pub struct CategoryFileLogger {
    inner: Box<dyn Log>,
    general: Mutex<File>,
    debug: Mutex<File>,
    enum_: Mutex<File>,
    user: Mutex<File>,
    agent: Mutex<File>,
    database: Mutex<File>,
}

impl CategoryFileLogger {
    pub fn open(logs_dir: &Path, level_filter: &str) -> std::io::Result<Self> {
        std::fs::create_dir_all(logs_dir)?;
        let open = |name: &str| -> std::io::Result<Mutex<File>> {
            Ok(Mutex::new(OpenOptions::new().create(true).append(true).open(logs_dir.join(name))?))
        };
        let inner: Box<dyn Log> =
            Box::new(pretty_env_logger::formatted_builder().parse_filters(level_filter).build());
        Ok(Self {
            inner,
            general: open(Category::General.file_name())?,
            debug: open(Category::Debug.file_name())?,
            enum_: open(Category::Enum.file_name())?,
            user: open(Category::User.file_name())?,
            agent: open(Category::Agent.file_name())?,
            database: open(Category::Database.file_name())?,
        })
    }

    fn file_for(&self, category: Category) -> &Mutex<File> {
        match category {
            Category::General => &self.general,
            Category::Debug => &self.debug,
            Category::Enum => &self.enum_,
            Category::User => &self.user,
            Category::Agent => &self.agent,
            Category::Database => &self.database,
        }
    }

    fn write_line(&self, category: Category, line: &str) {
        if let Ok(mut file) = self.file_for(category).lock() {
            let _ = writeln!(file, "{line}");
        }
    }
}

impl Log for CategoryFileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.inner.enabled(record.metadata()) {
            return;
        }
        self.inner.log(record);
        let line = format!(
            "{} [{}] {}: {}",
            chrono::Utc::now().to_rfc3339(),
            record.level(),
            record.target(),
            record.args()
        );
        let category = Category::for_target(record.target());
        self.write_line(category, &line);
        if record.level() <= Level::Debug && category != Category::Debug {
            self.write_line(Category::Debug, &line);
        }
    }

    fn flush(&self) {
        self.inner.flush();
        for file in [&self.general, &self.debug, &self.enum_, &self.user, &self.agent, &self.database] {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_prefixes_route_to_the_right_category() {
        assert_eq!(Category::for_target("bleep_agent::agent"), Category::Agent);
        assert_eq!(Category::for_target("bleep_store::store"), Category::Database);
        assert_eq!(Category::for_target("bleep_async::pool"), Category::Enum);
        assert_eq!(Category::for_target("bleep::ble_ctf"), Category::User);
        assert_eq!(Category::for_target("something_else"), Category::General);
    }
}
