//! 64 KiB flat memory with a memory-mapped I/O window and a timer counter.
//!
//! Output/input/trace hooks are pluggable closures injected at construction,
//! avoiding global mutable state for the I/O sinks/sources.

use byteorder::{ByteOrder, LittleEndian};

use crate::constants::{IO_INPUT, IO_OUTPUT, IO_TIMER_CTRL, IO_TIMER_LOW, MEMORY_SIZE};

type Endian = LittleEndian;

/// Callback invoked on every byte store, with `(address, old, new)`.
pub type TraceHook<'a> = Box<dyn FnMut(u16, u8, u8) + 'a>;

/// Error returned by [`Memory::load_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LoadImageError {
    #[error("image of {len} bytes at base {base:#06x} would exceed the 64 KiB address space")]
    OutOfRange { base: u16, len: usize },
}

/// The flat byte-addressable store plus I/O window and timer.
pub struct Memory {
    data: Box<[u8; MEMORY_SIZE]>,
    timer: u16,
    timer_running: bool,
    output_sink: Option<Box<dyn FnMut(u8)>>,
    input_source: Option<Box<dyn FnMut() -> u8>>,
}

impl Default for Memory {
    fn default() -> Self {
        Memory {
            data: Box::new([0u8; MEMORY_SIZE]),
            timer: 0,
            timer_running: false,
            output_sink: None,
            input_source: None,
        }
    }
}

impl Memory {
    pub fn new() -> Memory {
        Memory::default()
    }

    /// Installs the sink invoked when the CPU writes to `0xF000`.
    pub fn set_output_sink<F: FnMut(u8) + 'static>(&mut self, sink: F) {
        self.output_sink = Some(Box::new(sink));
    }

    /// Installs the source invoked when the CPU reads from `0xF001`.
    pub fn set_input_source<F: FnMut() -> u8 + 'static>(&mut self, source: F) {
        self.input_source = Some(Box::new(source));
    }

    /// Copies `bytes` into the store starting at `base`. Rejects images
    /// whose end exceeds the 64 KiB address space; never wraps.
    pub fn load_image(&mut self, bytes: &[u8], base: u16) -> Result<(), LoadImageError> {
        let end = base as usize + bytes.len();
        if end > MEMORY_SIZE {
            return Err(LoadImageError::OutOfRange {
                base,
                len: bytes.len(),
            });
        }
        self.data[base as usize..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Reads the raw backing byte at `address` without consulting the
    /// input source or the timer registers. Intended for host inspection
    /// (debugger memory dumps, tests) of plain RAM/program addresses, not
    /// for CPU execution semantics.
    pub fn read_byte_const(&self, address: u16) -> u8 {
        self.data[address as usize]
    }

    /// Reads a byte, consulting the I/O window's input source and timer
    /// registers where applicable.
    pub fn read_byte(&mut self, address: u16) -> u8 {
        match address {
            IO_INPUT => {
                if let Some(source) = self.input_source.as_mut() {
                    source()
                } else {
                    0
                }
            }
            IO_TIMER_LOW => (self.timer & 0xFF) as u8,
            IO_TIMER_CTRL => (self.timer >> 8) as u8,
            _ => self.data[address as usize],
        }
    }

    /// Writes a byte, applying I/O-window interception and invoking
    /// `trace` with `(address, old, new)` for every store, including ones
    /// intercepted by the I/O window (the backing byte for `0xF000` is not
    /// retained, but the trace event still fires with `new` as the value
    /// that was delivered to the sink and `old` as whatever happened to be
    /// in the backing array).
    pub fn write_byte_traced(&mut self, address: u16, value: u8, trace: Option<&mut TraceHook>) {
        let old = self.data[address as usize];
        match address {
            IO_OUTPUT => {
                if let Some(sink) = self.output_sink.as_mut() {
                    sink(value);
                }
            }
            IO_TIMER_CTRL => {
                let starting = value & 0x1 != 0;
                if !starting && self.timer_running {
                    self.timer = 0;
                }
                self.timer_running = starting;
                self.data[address as usize] = value;
            }
            _ => {
                self.data[address as usize] = value;
            }
        }
        if let Some(hook) = trace {
            hook(address, old, value);
        }
    }

    pub fn write_byte(&mut self, address: u16, value: u8) {
        self.write_byte_traced(address, value, None);
    }

    /// Little-endian word read. Addresses wrap modulo 16 bits: a read at
    /// `0xFFFF` reads bytes `0xFFFF` then `0x0000`.
    pub fn read_word(&mut self, address: u16) -> u16 {
        let lo = self.read_byte(address);
        let hi = self.read_byte(address.wrapping_add(1));
        Endian::read_u16(&[lo, hi])
    }

    pub fn write_word(&mut self, address: u16, value: u16) {
        self.write_word_traced(address, value, None);
    }

    pub fn write_word_traced(&mut self, address: u16, value: u16, mut trace: Option<&mut TraceHook>) {
        let mut buf = [0u8; 2];
        Endian::write_u16(&mut buf, value);
        self.write_byte_traced(address, buf[0], trace.as_deref_mut());
        self.write_byte_traced(address.wrapping_add(1), buf[1], trace.as_deref_mut());
    }

    /// Advances the timer by one tick when running, with 16-bit wrap. Driven
    /// by the host, never by the CPU.
    pub fn tick(&mut self) {
        if self.timer_running {
            self.timer = self.timer.wrapping_add(1);
        }
    }

    pub fn timer(&self) -> u16 {
        self.timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn load_image_rejects_overflow() {
        let mut mem = Memory::new();
        let bytes = vec![0u8; 10];
        assert!(mem.load_image(&bytes, 0xFFFE).is_err());
        assert!(mem.load_image(&bytes, 0x8000).is_ok());
    }

    #[test]
    fn word_access_wraps_at_top_of_address_space() {
        let mut mem = Memory::new();
        mem.write_byte(0xFFFF, 0xEF);
        mem.write_byte(0x0000, 0xBE);
        assert_eq!(mem.read_word(0xFFFF), 0xBEEF);
    }

    #[test]
    fn output_sink_receives_byte_and_does_not_persist() {
        let received = Rc::new(RefCell::new(Vec::new()));
        let received_clone = received.clone();
        let mut mem = Memory::new();
        mem.set_output_sink(move |byte| received_clone.borrow_mut().push(byte));
        mem.write_byte(0xF000, b'H');
        mem.write_byte(0xF000, b'i');
        assert_eq!(*received.borrow(), vec![b'H', b'i']);
    }

    #[test]
    fn input_source_is_consulted_on_read() {
        let mut mem = Memory::new();
        let mut values = vec![7u8, 8u8].into_iter();
        mem.set_input_source(move || values.next().unwrap_or(0));
        assert_eq!(mem.read_byte(0xF001), 7);
        assert_eq!(mem.read_byte(0xF001), 8);
    }

    #[test]
    fn timer_counts_while_running_and_clears_on_stop() {
        let mut mem = Memory::new();
        mem.write_byte(IO_TIMER_CTRL, 1);
        mem.tick();
        mem.tick();
        mem.tick();
        assert_eq!(mem.timer(), 3);
        mem.write_byte(IO_TIMER_CTRL, 0);
        mem.tick();
        assert_eq!(mem.timer(), 0);
    }

    #[test]
    fn trace_hook_observes_address_old_new() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let events_clone = events.clone();
        let mut mem = Memory::new();
        let mut hook: TraceHook = Box::new(move |addr, old, new| {
            events_clone.borrow_mut().push((addr, old, new));
        });
        mem.write_byte_traced(0x1000, 0x42, Some(&mut hook));
        assert_eq!(*events.borrow(), vec![(0x1000, 0, 0x42)]);
    }
}
