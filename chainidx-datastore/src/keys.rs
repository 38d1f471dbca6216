use chainidx_core::{Address, Network};

/// Divisor for the timestamp-bucketed lock index. Chosen to coarsen
/// maturation scans to roughly one bucket per day (~100,000 seconds) while
/// height buckets stay exact.
pub const TIME_BUCKET_DIVISOR: u64 = 100_000;

pub fn time_bucket(timestamp: u64) -> u64 {
    timestamp / TIME_BUCKET_DIVISOR
}

/// Builds every reserved key under `<chainName>:<networkName>:`.
#[derive(Debug, Clone)]
pub struct KeySchema {
    prefix: String,
}

impl KeySchema {
    pub fn new(chain_name: &str, network: Network) -> Self {
        Self {
            prefix: format!("{chain_name}:{network}:"),
        }
    }

    pub fn state(&self) -> String {
        format!("{}state", self.prefix)
    }

    pub fn stats(&self) -> String {
        format!("{}stats", self.prefix)
    }

    pub fn addresses(&self) -> String {
        format!("{}addresses", self.prefix)
    }

    pub fn balance(&self, addr: &Address) -> String {
        format!("{}address:{}:balance", self.prefix, addr.to_hex())
    }

    pub fn outputs_locked(&self, addr: &Address) -> String {
        format!("{}address:{}:outputs.locked", self.prefix, addr.to_hex())
    }

    pub fn multisig_addresses(&self, addr: &Address) -> String {
        format!("{}address:{}:multisig.addresses", self.prefix, addr.to_hex())
    }

    pub fn ucos(&self) -> String {
        format!("{}ucos", self.prefix)
    }

    pub fn lcos_height(&self, height: u64) -> String {
        format!("{}lcos.height:{height}", self.prefix)
    }

    pub fn lcos_time_bucket(&self, bucket: u64) -> String {
        format!("{}lcos.time:{bucket}", self.prefix)
    }

    /// Internal cursor: the highest timestamp bucket already fully scanned
    /// for promotion, so `promote` never has to rescan buckets it already
    /// cleared out.
    pub fn lcos_time_cursor(&self) -> String {
        format!("{}lcos.time.cursor", self.prefix)
    }

    /// Internal cursor: the highest height already fully scanned for
    /// promotion.
    pub fn lcos_height_cursor(&self) -> String {
        format!("{}lcos.height.cursor", self.prefix)
    }

    /// Reverse index from coin output id to its `LockedOutputRecord`, so
    /// `removeLocked`/promotion can find a record's bucket and owning
    /// address without a hash field carrying the bucket key itself.
    pub fn lcos_by_id(&self) -> String {
        format!("{}lcos.by_id", self.prefix)
    }
}
