//! Blob builder for tests.

use alloc::vec;
use alloc::vec::Vec;

use crate::crc::calculate_crc32;
use crate::schema::{
    ChipCfg, ExtraCfg, ParamList, Record, RegNode, CHANNEL_ENABLED, CHANNEL_NUM, FW_VERSION,
};

pub(crate) struct BlobBuilder {
    version: u32,
    ch_en: [u8; CHANNEL_NUM],
    chips: [Vec<(u32, Vec<RegNode>)>; CHANNEL_NUM],
    list_override: [Option<ParamList>; CHANNEL_NUM],
    extra_cfg: [ExtraCfg; CHANNEL_NUM],
    data: Vec<u8>,
    padding: usize,
}

impl BlobBuilder {
    pub(crate) fn new() -> Self {
        Self {
            version: FW_VERSION,
            ch_en: [0; CHANNEL_NUM],
            chips: Default::default(),
            list_override: [None; CHANNEL_NUM],
            extra_cfg: [ExtraCfg::default(); CHANNEL_NUM],
            data: Vec::new(),
            padding: 0,
        }
    }

    pub(crate) fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub(crate) fn channel(mut self, ch: usize, enabled: bool) -> Self {
        self.ch_en[ch] = if enabled { CHANNEL_ENABLED } else { 0 };
        self
    }

    /// Add a chip record to `ch` whose `init` list holds `regs`.
    pub(crate) fn chip(mut self, ch: usize, chip_type: u32, regs: &[RegNode]) -> Self {
        self.chips[ch].push((chip_type, regs.to_vec()));
        self
    }

    /// Replace the chip list descriptor of `ch` verbatim.
    pub(crate) fn chip_cfg_list(mut self, ch: usize, list: ParamList) -> Self {
        self.list_override[ch] = Some(list);
        self
    }

    pub(crate) fn extra_cfg(mut self, ch: usize, cfg: ExtraCfg) -> Self {
        self.extra_cfg[ch] = cfg;
        self
    }

    /// Leading bytes of the data region.
    pub(crate) fn data(mut self, bytes: &[u8]) -> Self {
        self.data.extend_from_slice(bytes);
        self
    }

    /// Bytes appended after the checksummed range.
    pub(crate) fn padding(mut self, len: usize) -> Self {
        self.padding = len;
        self
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let mut data = self.data;
        let mut lists = [ParamList::default(); CHANNEL_NUM];

        for (ch, chips) in self.chips.iter().enumerate() {
            let mut cfgs = Vec::new();
            for (chip_type, regs) in chips {
                let init = ParamList {
                    node_size: RegNode::SIZE as u32,
                    offset: data.len() as u32,
                    num: regs.len() as u32,
                };
                for reg in regs {
                    put_u32(&mut data, reg.addr);
                    put_u32(&mut data, reg.val);
                }
                cfgs.push(ChipCfg {
                    chip_type: *chip_type,
                    init,
                    ..Default::default()
                });
            }

            lists[ch] = ParamList {
                node_size: ChipCfg::SIZE as u32,
                offset: data.len() as u32,
                num: cfgs.len() as u32,
            };
            for cfg in &cfgs {
                put_u32(&mut data, cfg.chip_type);
                put_list(&mut data, &cfg.init);
                put_list(&mut data, &cfg.startup);
                put_list(&mut data, &cfg.shutdown);
            }
        }

        let mut blob = Vec::new();
        put_u32(&mut blob, 0);
        put_u32(&mut blob, self.version);
        put_u32(&mut blob, data.len() as u32);
        blob.extend_from_slice(&self.ch_en);
        for (ch, list) in lists.iter().enumerate() {
            put_list(&mut blob, &self.list_override[ch].unwrap_or(*list));
        }
        for cfg in &self.extra_cfg {
            put_u32(&mut blob, cfg.spk_min_r0);
            put_u32(&mut blob, cfg.spk_max_r0);
            put_u32(&mut blob, cfg.spk_max_delta_r0);
        }
        blob.extend_from_slice(&data);

        let crc = calculate_crc32(&blob[4..]);
        blob[0..4].copy_from_slice(&crc.to_le_bytes());
        blob.extend_from_slice(&vec![0xFF; self.padding]);
        blob
    }
}

fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn put_list(buf: &mut Vec<u8>, list: &ParamList) {
    put_u32(buf, list.node_size);
    put_u32(buf, list.offset);
    put_u32(buf, list.num);
}

/// Recompute the header CRC after a test edited the blob.
pub(crate) fn reseal(blob: &mut [u8]) {
    let crc = calculate_crc32(&blob[4..]);
    blob[0..4].copy_from_slice(&crc.to_le_bytes());
}
