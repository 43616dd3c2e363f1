use crate::{Result, RexxError, RexxString, settings};

#[inline]
fn is_blank(byte: u8) -> bool {
    byte == b' ' || byte == b'\t'
}

/// Convert a 1-based position argument into a byte offset.
fn offset_of(position: usize, argument: usize) -> Result<usize> {
    position
        .checked_sub(1)
        .ok_or_else(|| RexxError::invalid_index(argument, position))
}

// `data` cut or padded to exactly `length` bytes
fn fitted(data: &[u8], length: Option<usize>, pad: u8) -> Vec<u8> {
    let length = length.unwrap_or(data.len());
    let mut out = Vec::with_capacity(length);
    out.extend_from_slice(&data[..length.min(data.len())]);
    out.resize(length, pad);
    out
}

fn matches_at(haystack: &[u8], needle: &[u8], caseless: bool) -> bool {
    if caseless {
        haystack.eq_ignore_ascii_case(needle)
    } else {
        haystack == needle
    }
}

/// Non-overlapping match offsets, left to right.
fn find_all(haystack: &[u8], needle: &[u8], caseless: bool, limit: usize) -> Vec<usize> {
    let mut found = Vec::new();
    if needle.is_empty() || needle.len() > haystack.len() {
        return found;
    }
    let mut at = 0;
    while found.len() < limit && at + needle.len() <= haystack.len() {
        if matches_at(&haystack[at..at + needle.len()], needle, caseless) {
            found.push(at);
            at += needle.len();
        } else {
            at += 1;
        }
    }
    found
}

/// Growable byte buffer edited in place.
#[derive(Debug, Clone)]
pub struct MutableBuffer {
    data: Vec<u8>,
    buffer_length: usize,
    default_size: usize,
}

impl Default for MutableBuffer {
    fn default() -> Self {
        Self::new(b"")
    }
}

impl MutableBuffer {
    pub fn new(initial: &[u8]) -> Self {
        let default_size = settings::get().default_buffer_size;
        let buffer_length = default_size.max(initial.len());
        let mut data = Vec::with_capacity(buffer_length);
        data.extend_from_slice(initial);
        Self {
            data,
            buffer_length,
            default_size,
        }
    }

    /// Buffer with an explicit starting size, which also becomes the size
    /// restored by `set_buffer_size(0)`.
    pub fn with_size(initial: &[u8], size: usize) -> Result<Self> {
        let maximum = settings::get().max_buffer_size;
        if size > maximum {
            return Err(RexxError::BufferTooBig {
                requested: size,
                maximum,
            });
        }
        let default_size = size.max(1);
        let buffer_length = default_size.max(initial.len());
        let mut data = Vec::new();
        data.try_reserve_exact(buffer_length)
            .map_err(|_| RexxError::OutOfMemory {
                bytes: buffer_length,
            })?;
        data.extend_from_slice(initial);
        Ok(Self {
            data,
            buffer_length,
            default_size,
        })
    }

    #[inline]
    pub fn length(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.buffer_length
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn make_string(&self) -> RexxString {
        RexxString::from(self.data.as_slice())
    }

    /// Make room for `additional` more bytes. Doubles the buffer, or
    /// grows to exactly the needed size when doubling is not enough.
    pub fn ensure_capacity(&mut self, additional: usize) -> Result<()> {
        let maximum = settings::get().max_buffer_size;
        let needed = self.data.len().checked_add(additional).ok_or(RexxError::BufferTooBig {
            requested: usize::MAX,
            maximum,
        })?;
        if needed <= self.buffer_length {
            return Ok(());
        }
        let target = self.buffer_length.saturating_mul(2).max(needed);
        if needed > maximum {
            return Err(RexxError::BufferTooBig {
                requested: needed,
                maximum,
            });
        }
        let target = target.min(maximum);
        self.data
            .try_reserve_exact(target - self.data.len())
            .map_err(|_| RexxError::OutOfMemory { bytes: target })?;
        log::trace!("buffer grown from {} to {} bytes", self.buffer_length, target);
        self.buffer_length = target;
        Ok(())
    }

    /// Resize the buffer. Content beyond a smaller size is dropped;
    /// `0` restores the default size and empties the buffer.
    pub fn set_buffer_size(&mut self, size: usize) -> Result<()> {
        if size == 0 {
            self.data = Vec::with_capacity(self.default_size);
            self.buffer_length = self.default_size;
            return Ok(());
        }
        let maximum = settings::get().max_buffer_size;
        if size > maximum {
            return Err(RexxError::BufferTooBig {
                requested: size,
                maximum,
            });
        }
        self.data.truncate(size);
        if size > self.data.capacity() {
            self.data
                .try_reserve_exact(size - self.data.len())
                .map_err(|_| RexxError::OutOfMemory { bytes: size })?;
        } else {
            self.data.shrink_to(size);
        }
        self.buffer_length = size;
        Ok(())
    }

    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_capacity(data.len())?;
        self.data.extend_from_slice(data);
        Ok(())
    }

    // pad the content up to `offset`, ready for a write there
    fn pad_to(&mut self, offset: usize, pad: u8) -> Result<()> {
        if offset > self.data.len() {
            self.ensure_capacity(offset - self.data.len())?;
            self.data.resize(offset, pad);
        }
        Ok(())
    }

    /// Insert `data` so that it starts at `position`. `length` cuts or
    /// pads the inserted data; a gap past the end is filled with `pad`.
    pub fn insert(&mut self, data: &[u8], position: usize, length: Option<usize>, pad: u8) -> Result<()> {
        let offset = offset_of(position, 2)?;
        let inserted = fitted(data, length, pad);
        if inserted.is_empty() && offset <= self.data.len() {
            return Ok(());
        }
        self.pad_to(offset, pad)?;
        self.ensure_capacity(inserted.len())?;
        self.data.splice(offset..offset, inserted);
        Ok(())
    }

    /// Write `data` over the content at `position`, extending the buffer
    /// only where it runs past the end.
    pub fn overlay(&mut self, data: &[u8], position: usize, length: Option<usize>, pad: u8) -> Result<()> {
        let offset = offset_of(position, 2)?;
        let written = fitted(data, length, pad);
        self.pad_to(offset, pad)?;
        let end = offset + written.len();
        if end > self.data.len() {
            self.ensure_capacity(end - self.data.len())?;
            self.data.resize(end, pad);
        }
        self.data[offset..end].copy_from_slice(&written);
        Ok(())
    }

    /// Replace `length` bytes at `position` (default `data.len()`) with
    /// `data`. Starting past the end pads and appends.
    pub fn replace_at(&mut self, data: &[u8], position: usize, length: Option<usize>, pad: u8) -> Result<()> {
        let offset = offset_of(position, 2)?;
        if offset > self.data.len() {
            self.pad_to(offset, pad)?;
            return self.append(data);
        }
        let excised = length.unwrap_or(data.len()).min(self.data.len() - offset);
        if data.len() > excised {
            self.ensure_capacity(data.len() - excised)?;
        }
        self.data.splice(offset..offset + excised, data.iter().copied());
        Ok(())
    }

    /// Remove `length` bytes (default all) starting at `position`.
    pub fn delete(&mut self, position: usize, length: Option<usize>) -> Result<()> {
        let offset = offset_of(position, 1)?;
        if offset >= self.data.len() {
            return Ok(());
        }
        let end = match length {
            Some(length) => offset.saturating_add(length).min(self.data.len()),
            None => self.data.len(),
        };
        self.data.drain(offset..end);
        Ok(())
    }

    /// Replace up to `count` occurrences of `needle`. Returns how many
    /// were replaced.
    pub fn change_str(&mut self, needle: &[u8], replacement: &[u8], count: Option<usize>) -> Result<usize> {
        self.change(needle, replacement, count, false)
    }

    pub fn caseless_change_str(&mut self, needle: &[u8], replacement: &[u8], count: Option<usize>) -> Result<usize> {
        self.change(needle, replacement, count, true)
    }

    fn change(&mut self, needle: &[u8], replacement: &[u8], count: Option<usize>, caseless: bool) -> Result<usize> {
        let found = find_all(&self.data, needle, caseless, count.unwrap_or(usize::MAX));
        if found.is_empty() {
            return Ok(0);
        }
        let (old, new) = (needle.len(), replacement.len());

        if new == old {
            for &at in &found {
                self.data[at..at + new].copy_from_slice(replacement);
            }
        } else if new < old {
            // compact toward the front
            let mut write = found[0];
            for (n, &at) in found.iter().enumerate() {
                self.data[write..write + new].copy_from_slice(replacement);
                write += new;
                let from = at + old;
                let to = found.get(n + 1).copied().unwrap_or(self.data.len());
                self.data.copy_within(from..to, write);
                write += to - from;
            }
            self.data.truncate(write);
        } else {
            // grow once, then move segments toward the back
            let growth = (new - old) * found.len();
            self.ensure_capacity(growth)?;
            let old_len = self.data.len();
            self.data.resize(old_len + growth, 0);
            let mut end = old_len;
            let mut write_end = old_len + growth;
            for &at in found.iter().rev() {
                let tail = at + old;
                let moved = end - tail;
                self.data.copy_within(tail..end, write_end - moved);
                write_end -= moved;
                self.data[write_end - new..write_end].copy_from_slice(replacement);
                write_end -= new;
                end = at;
            }
        }
        Ok(found.len())
    }

    // (start, end) byte offsets of every blank-delimited word
    fn word_spans(&self) -> Vec<(usize, usize)> {
        let mut spans = Vec::new();
        let mut start = None;
        for (i, &byte) in self.data.iter().enumerate() {
            match (start, is_blank(byte)) {
                (None, false) => start = Some(i),
                (Some(s), true) => {
                    spans.push((s, i));
                    start = None;
                }
                _ => (),
            }
        }
        if let Some(s) = start {
            spans.push((s, self.data.len()));
        }
        spans
    }

    pub fn words(&self) -> usize {
        self.word_spans().len()
    }

    pub fn word(&self, n: usize) -> RexxString {
        match n.checked_sub(1).and_then(|i| self.word_spans().get(i).copied()) {
            Some((start, end)) => RexxString::from(&self.data[start..end]),
            None => RexxString::from(""),
        }
    }

    /// 1-based position of word `n`, 0 when there is none.
    pub fn word_index(&self, n: usize) -> usize {
        n.checked_sub(1)
            .and_then(|i| self.word_spans().get(i).map(|&(start, _)| start + 1))
            .unwrap_or(0)
    }

    pub fn word_length(&self, n: usize) -> usize {
        n.checked_sub(1)
            .and_then(|i| self.word_spans().get(i).map(|&(start, end)| end - start))
            .unwrap_or(0)
    }

    /// Delete `count` words (default all) from word `n`, with the blanks
    /// that follow the last deleted word.
    pub fn del_word(&mut self, n: usize, count: Option<usize>) -> Result<()> {
        let index = offset_of(n, 1)?;
        let spans = self.word_spans();
        let Some(&(start, _)) = spans.get(index) else {
            return Ok(());
        };
        let last = match count {
            Some(0) => return Ok(()),
            Some(count) => index.saturating_add(count - 1),
            None => usize::MAX,
        };
        let end = match spans.get(last.saturating_add(1)) {
            Some(&(next, _)) if last < spans.len() => next,
            _ => self.data.len(),
        };
        self.data.drain(start..end);
        Ok(())
    }

    /// Substring with padding past the end.
    pub fn sub_str(&self, position: usize, length: Option<usize>, pad: u8) -> Result<RexxString> {
        let offset = offset_of(position, 1)?;
        let available = self.data.len().saturating_sub(offset);
        let length = length.unwrap_or(available);
        let mut out = Vec::with_capacity(length);
        if offset < self.data.len() {
            out.extend_from_slice(&self.data[offset..offset + length.min(available)]);
        }
        out.resize(length, pad);
        Ok(RexxString::from(out))
    }

    pub fn sub_char(&self, position: usize) -> RexxString {
        match position.checked_sub(1).and_then(|offset| self.data.get(offset)) {
            Some(&byte) => RexxString::from(vec![byte]),
            None => RexxString::from(""),
        }
    }

    fn search(&self, needle: &[u8], start: usize, caseless: bool) -> Result<usize> {
        let offset = offset_of(start, 2)?;
        if needle.is_empty() || offset >= self.data.len() {
            return Ok(0);
        }
        Ok(self.data[offset..]
            .windows(needle.len())
            .position(|window| matches_at(window, needle, caseless))
            .map_or(0, |at| offset + at + 1))
    }

    fn search_back(&self, needle: &[u8], start: Option<usize>, caseless: bool) -> Result<usize> {
        let end = match start {
            Some(start) => offset_of(start, 2)?.saturating_add(1).min(self.data.len()),
            None => self.data.len(),
        };
        if needle.is_empty() || needle.len() > self.data.len() {
            return Ok(0);
        }
        // `start` is the last position a match may begin at
        let limit = (end + needle.len() - 1).min(self.data.len());
        Ok(self.data[..limit]
            .windows(needle.len())
            .rposition(|window| matches_at(window, needle, caseless))
            .map_or(0, |at| at + 1))
    }

    /// 1-based position of `needle` at or after `start`, 0 if absent.
    pub fn pos(&self, needle: &[u8], start: usize) -> Result<usize> {
        self.search(needle, start, false)
    }

    pub fn caseless_pos(&self, needle: &[u8], start: usize) -> Result<usize> {
        self.search(needle, start, true)
    }

    /// Last occurrence beginning at or before `start` (default the end).
    pub fn last_pos(&self, needle: &[u8], start: Option<usize>) -> Result<usize> {
        self.search_back(needle, start, false)
    }

    pub fn caseless_last_pos(&self, needle: &[u8], start: Option<usize>) -> Result<usize> {
        self.search_back(needle, start, true)
    }

    pub fn count_str(&self, needle: &[u8]) -> usize {
        find_all(&self.data, needle, false, usize::MAX).len()
    }

    pub fn caseless_count_str(&self, needle: &[u8]) -> usize {
        find_all(&self.data, needle, true, usize::MAX).len()
    }

    fn span(&self, start: usize, length: Option<usize>) -> Result<std::ops::Range<usize>> {
        let offset = offset_of(start, 1)?.min(self.data.len());
        let end = match length {
            Some(length) => offset.saturating_add(length).min(self.data.len()),
            None => self.data.len(),
        };
        Ok(offset..end)
    }

    pub fn upper(&mut self, start: usize, length: Option<usize>) -> Result<()> {
        let range = self.span(start, length)?;
        self.data[range].make_ascii_uppercase();
        Ok(())
    }

    pub fn lower(&mut self, start: usize, length: Option<usize>) -> Result<()> {
        let range = self.span(start, length)?;
        self.data[range].make_ascii_lowercase();
        Ok(())
    }
}
