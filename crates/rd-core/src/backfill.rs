use crate::events::AddressRow;
use crate::ip::{self, Candidate, Reason};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillOptions {
    /// Restrict targets to these exact stored addresses.
    pub only_ips: Option<HashSet<String>>,
    /// Rows scanned, oldest first. `None`/0 scans everything.
    pub limit: Option<u32>,
}

impl BackfillOptions {
    /// Parses a comma-separated `--only-ips` value; blank entries are ignored.
    pub fn only_ips_from_list(list: &str) -> HashSet<String> {
        list.split(',')
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn targets(&self, current_ip: &str) -> bool {
        if current_ip.is_empty() || ip::is_public(current_ip) {
            return false;
        }
        self.only_ips
            .as_ref()
            .is_none_or(|only| only.contains(current_ip))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpCorrection {
    pub id: i64,
    pub old_ip: String,
    pub new_ip: String,
    pub reason: Reason,
}

/// Builds the correction list for scanned rows. Rows are untouched here.
pub fn plan(rows: Vec<AddressRow>, options: &BackfillOptions) -> Vec<IpCorrection> {
    rows.into_iter()
        .filter_map(|row| {
            let old_ip = row.client_ip.trim().to_string();
            if !options.targets(&old_ip) {
                return None;
            }
            match ip::propose(&row.headers, &old_ip) {
                Candidate::Found { ip, reason } if ip != old_ip => Some(IpCorrection {
                    id: row.id,
                    old_ip,
                    new_ip: ip,
                    reason,
                }),
                Candidate::Found { .. } => None,
                Candidate::None(why) => {
                    tracing::debug!(id = row.id, ?why, "no address candidate");
                    None
                }
            }
        })
        .collect()
}
