//! Slotted layout of a heap page.
//!
//! ```text
//! ┌────────────┬──────────────────┬────────┬────────┬─────┬──────────┐
//! │ PageHeader │ occupancy bitmap │ slot 0 │ slot 1 │ ... │ slot n-1 │
//! │  5 bytes   │   ceil(n/8) B    │        │        │     │          │
//! └────────────┴──────────────────┴────────┴────────┴─────┴──────────┘
//! ```
//!
//! Every slot is `tuple_size` bytes. Each slot costs `tuple_size * 8 + 1`
//! bits (data plus its bitmap bit), which fixes `n`.

use std::sync::Arc;

use crate::common::{Error, PageId, Result};
use crate::storage::page::{PageHeader, PageType};
use crate::tuple::{RecordId, Tuple, TupleDesc};

/// Geometry of heap pages for one schema and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout {
    tuple_size: usize,
    num_slots: usize,
    bitmap_len: usize,
}

impl SlotLayout {
    /// Compute the layout, failing if not even one tuple fits.
    pub fn new(desc: &TupleDesc, page_size: usize) -> Result<Self> {
        let tuple_size = desc.byte_size();
        let usable = page_size.saturating_sub(PageHeader::SIZE);
        if tuple_size == 0 {
            return Err(Error::SchemaMismatch("schema has no fields".into()));
        }

        let num_slots = (usable * 8) / (tuple_size * 8 + 1);
        if num_slots == 0 {
            return Err(Error::SchemaMismatch(format!(
                "{}-byte tuples do not fit in {}-byte pages",
                tuple_size, page_size
            )));
        }

        Ok(Self {
            tuple_size,
            num_slots,
            bitmap_len: num_slots.div_ceil(8),
        })
    }

    #[inline]
    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    #[inline]
    pub fn tuple_size(&self) -> usize {
        self.tuple_size
    }

    /// Turn a blank page into an empty heap page.
    pub fn init(&self, data: &mut [u8]) {
        PageHeader::new(PageType::Heap).write_to(data);
        data[PageHeader::SIZE..PageHeader::SIZE + self.bitmap_len].fill(0);
    }

    pub fn is_used(&self, data: &[u8], slot: usize) -> bool {
        let byte = data[PageHeader::SIZE + slot / 8];
        (byte >> (slot % 8)) & 1 == 1
    }

    fn set_used(&self, data: &mut [u8], slot: usize, used: bool) {
        let byte = &mut data[PageHeader::SIZE + slot / 8];
        if used {
            *byte |= 1 << (slot % 8);
        } else {
            *byte &= !(1 << (slot % 8));
        }
    }

    pub fn free_slot(&self, data: &[u8]) -> Option<usize> {
        (0..self.num_slots).find(|&slot| !self.is_used(data, slot))
    }

    pub fn used_slots(&self, data: &[u8]) -> usize {
        (0..self.num_slots).filter(|&slot| self.is_used(data, slot)).count()
    }

    fn slot_range(&self, slot: usize) -> std::ops::Range<usize> {
        let start = PageHeader::SIZE + self.bitmap_len + slot * self.tuple_size;
        start..start + self.tuple_size
    }

    /// Store `tuple` in `slot` and mark it used.
    pub fn write_tuple(&self, data: &mut [u8], slot: usize, tuple: &Tuple) {
        if PageHeader::from_bytes(data).is_blank() {
            self.init(data);
        }
        let mut offset = self.slot_range(slot).start;
        for field in tuple.fields() {
            let len = field.field_type().byte_len();
            field.serialize(&mut data[offset..offset + len]);
            offset += len;
        }
        self.set_used(data, slot, true);
    }

    /// Mark `slot` free. The bytes are left in place.
    pub fn clear_slot(&self, data: &mut [u8], slot: usize) {
        self.set_used(data, slot, false);
    }

    /// Decode the tuple in `slot`.
    pub fn read_tuple(
        &self,
        data: &[u8],
        pid: PageId,
        slot: usize,
        desc: &Arc<TupleDesc>,
    ) -> Result<Tuple> {
        let mut offset = self.slot_range(slot).start;
        let mut fields = Vec::with_capacity(desc.num_fields());
        for item in desc.items() {
            let len = item.field_type.byte_len();
            let field = item.field_type.parse(&data[offset..offset + len]).map_err(|e| {
                Error::CorruptPage {
                    page_id: pid,
                    reason: format!("slot {}: {}", slot, e),
                }
            })?;
            fields.push(field);
            offset += len;
        }
        let mut tuple = Tuple::new(Arc::clone(desc), fields)?;
        tuple.set_record_id(Some(RecordId::new(pid, slot)));
        Ok(tuple)
    }

    /// Decode every used slot, in slot order.
    pub fn tuples(&self, data: &[u8], pid: PageId, desc: &Arc<TupleDesc>) -> Result<Vec<Tuple>> {
        (0..self.num_slots)
            .filter(|&slot| self.is_used(data, slot))
            .map(|slot| self.read_tuple(data, pid, slot, desc))
            .collect()
    }
}
