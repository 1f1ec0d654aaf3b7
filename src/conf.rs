use std::fs::File;
use std::io::{self, BufRead, BufReader};
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub logfile: Option<String>,
    pub loglevel: String,
    pub databases: usize,
    pub maxclients: u64,
    /// Page size used when KEYS and DBSIZE walk a store to the end.
    pub scan_batch_size: usize,
    pub type_index_cache: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 6380,
            logfile: None,
            loglevel: "info".to_string(),
            databases: 16,
            maxclients: 10000,
            scan_batch_size: 100,
            type_index_cache: false,
        }
    }
}

impl Config {
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

pub fn load_config(path: Option<&str>) -> io::Result<Config> {
    let Some(p) = path else {
        info!("no config path provided, using default config");
        return Ok(Config::default());
    };
    let file = File::open(p)?;
    info!("loading config from {}", p);
    parse_config(BufReader::new(file))
}

fn parse_yes_no(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    }
}

pub fn parse_config<R: BufRead>(reader: R) -> io::Result<Config> {
    let mut cfg = Config::default();
    for line in reader.lines() {
        let mut l = line?;
        if let Some(idx) = l.find('#') {
            l.truncate(idx);
        }
        let l = l.trim();
        if l.is_empty() {
            continue;
        }
        let parts: Vec<&str> = l.split_whitespace().collect();
        if parts.len() < 2 {
            warn!("ignoring config line without value: '{}'", l);
            continue;
        }
        let value = parts[1];
        match parts[0].to_lowercase().as_str() {
            "bind" => {
                cfg.bind = value.to_string();
            }
            "port" => {
                if let Ok(pn) = value.parse::<u16>() {
                    cfg.port = pn;
                } else {
                    warn!("invalid port value '{}', keep previous {}", value, cfg.port);
                }
            }
            "logfile" => {
                let logfile = value.trim_matches('"').to_string();
                if !logfile.is_empty() {
                    cfg.logfile = Some(logfile);
                }
            }
            "loglevel" => match value.to_ascii_lowercase().as_str() {
                lvl @ ("trace" | "debug" | "info" | "warn" | "error") => {
                    cfg.loglevel = lvl.to_string();
                }
                _ => warn!("invalid loglevel '{}', keep previous {}", value, cfg.loglevel),
            },
            "databases" => match value.parse::<usize>() {
                Ok(n) if n > 0 => cfg.databases = n,
                _ => warn!("invalid databases value '{}', keep previous {}", value, cfg.databases),
            },
            "maxclients" => match value.parse::<u64>() {
                Ok(n) if n > 0 => cfg.maxclients = n,
                _ => warn!("invalid maxclients value '{}', keep previous {}", value, cfg.maxclients),
            },
            "scan-batch-size" => match value.parse::<usize>() {
                Ok(n) if n > 0 => cfg.scan_batch_size = n,
                _ => warn!(
                    "invalid scan-batch-size value '{}', keep previous {}",
                    value, cfg.scan_batch_size
                ),
            },
            "type-index-cache" => match parse_yes_no(value) {
                Some(b) => cfg.type_index_cache = b,
                None => warn!(
                    "invalid type-index-cache value '{}', keep previous {}",
                    value, cfg.type_index_cache
                ),
            },
            other => {
                warn!("unknown config directive '{}'", other);
            }
        }
    }
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let cfg = parse_config("".as_bytes()).unwrap();
        assert_eq!(cfg.address(), "127.0.0.1:6380");
        assert_eq!(cfg.databases, 16);
        assert_eq!(cfg.scan_batch_size, 100);
        assert!(!cfg.type_index_cache);
        assert!(cfg.logfile.is_none());
    }

    #[test]
    fn parses_directives_and_comments() {
        let text = "\
# sample
bind 0.0.0.0
PORT 7000   # trailing comment
logfile \"ledis.log\"
loglevel DEBUG
databases 4
maxclients 2
scan-batch-size 7
type-index-cache yes
";
        let cfg = parse_config(text.as_bytes()).unwrap();
        assert_eq!(cfg.address(), "0.0.0.0:7000");
        assert_eq!(cfg.logfile.as_deref(), Some("ledis.log"));
        assert_eq!(cfg.loglevel, "debug");
        assert_eq!(cfg.databases, 4);
        assert_eq!(cfg.maxclients, 2);
        assert_eq!(cfg.scan_batch_size, 7);
        assert!(cfg.type_index_cache);
    }

    #[test]
    fn invalid_values_keep_previous() {
        let text = "port 99999\ndatabases 0\nscan-batch-size -3\ntype-index-cache maybe\nloglevel loud\nfoo bar\nport\n";
        let cfg = parse_config(text.as_bytes()).unwrap();
        let def = Config::default();
        assert_eq!(cfg.port, def.port);
        assert_eq!(cfg.databases, def.databases);
        assert_eq!(cfg.scan_batch_size, def.scan_batch_size);
        assert_eq!(cfg.type_index_cache, def.type_index_cache);
        assert_eq!(cfg.loglevel, def.loglevel);
    }
}
