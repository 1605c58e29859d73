use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::datetime::parse_clock_time;
use crate::grid::{
  WorkingDays,
  WorkingHours
};

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config {
      map:          HashMap::new(),
      loaded_files: vec![]
    };

    cfg.map.insert(
      "data.location".to_string(),
      "~/.almanac".to_string()
    );
    cfg.map.insert(
      "default.command".to_string(),
      "list".to_string()
    );
    cfg.map.insert(
      "color".to_string(),
      "on".to_string()
    );
    cfg.map.insert(
      "time.format".to_string(),
      "12".to_string()
    );
    cfg.map.insert(
      "slot.interval".to_string(),
      "30".to_string()
    );
    cfg.map.insert(
      "day.start".to_string(),
      "0".to_string()
    );
    cfg.map.insert(
      "day.end".to_string(),
      "24".to_string()
    );
    cfg.map.insert(
      "working.start".to_string(),
      "09:00".to_string()
    );
    cfg.map.insert(
      "working.end".to_string(),
      "17:00".to_string()
    );
    cfg.map.insert(
      "working.days".to_string(),
      "mon,tue,wed,thu,fri"
        .to_string()
    );

    let rc_path =
      resolve_rc_path(rc_override)?;
    if let Some(path) = rc_path {
      info!(rc = %path.display(), "loading almanacrc");
      cfg.load_file(&path)?;
    } else {
      warn!(
        "no almanacrc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> Option<bool> {
    self
      .map
      .get(key)
      .map(|v| parse_bool(v))
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  /// 24-hour clock display when
  /// `time.format=24`.
  pub fn time_format_24(
    &self
  ) -> bool {
    self
      .get("time.format")
      .map(|v| v.trim() == "24")
      .unwrap_or(false)
  }

  pub fn slot_interval(
    &self
  ) -> u32 {
    self
      .get("slot.interval")
      .and_then(|v| {
        v.trim().parse().ok()
      })
      .filter(|n| *n > 0)
      .unwrap_or(30)
  }

  /// The `(start, end)` hour range
  /// the day/week time axis paints.
  pub fn day_hours(
    &self
  ) -> (u32, u32) {
    let start = self
      .get("day.start")
      .and_then(|v| {
        v.trim().parse().ok()
      })
      .unwrap_or(0);
    let end = self
      .get("day.end")
      .and_then(|v| {
        v.trim().parse().ok()
      })
      .unwrap_or(24)
      .min(24);
    (start, end)
  }

  pub fn working_hours(
    &self
  ) -> WorkingHours {
    let defaults =
      WorkingHours::default();
    let start = self
      .get("working.start")
      .and_then(|v| {
        parse_clock_time(&v)
      })
      .unwrap_or(defaults.start);
    let end = self
      .get("working.end")
      .and_then(|v| {
        parse_clock_time(&v)
      })
      .unwrap_or(defaults.end);
    WorkingHours {
      start,
      end
    }
  }

  pub fn working_days(
    &self
  ) -> WorkingDays {
    let Some(raw) =
      self.get("working.days")
    else {
      return WorkingDays::default();
    };

    let mut days = [false; 7];
    for token in raw.split(',') {
      if let Some(idx) =
        weekday_index(token.trim())
      {
        days[idx] = true;
      } else if !token
        .trim()
        .is_empty()
      {
        warn!(token = %token, "unknown working day token");
      }
    }
    WorkingDays(days)
  }

  pub fn timezone(
    &self
  ) -> Option<String> {
    self.get("timezone")
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(path) =
    override_dir
  {
    path.to_path_buf()
  } else if let Some(cfg_value) =
    cfg.get("data.location")
  {
    expand_tilde(Path::new(&cfg_value))
  } else {
    default_data_dir()?
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var("ALMANACRC")
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  let candidate =
    home.join(".almanacrc");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn default_data_dir()
-> anyhow::Result<PathBuf> {
  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  Ok(home.join(".almanac"))
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}

fn weekday_index(
  token: &str
) -> Option<usize> {
  match token
    .to_ascii_lowercase()
    .as_str()
  {
    | "sunday" | "sun" => Some(0),
    | "monday" | "mon" => Some(1),
    | "tuesday" | "tue" => Some(2),
    | "wednesday" | "wed" => Some(3),
    | "thursday" | "thu" => Some(4),
    | "friday" | "fri" => Some(5),
    | "saturday" | "sat" => Some(6),
    | _ => None
  }
}
