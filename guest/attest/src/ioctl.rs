//! Linux ioctl command word encoding (asm-generic layout).
//!
//! ```text
//!  31 30 29                16 15          8 7           0
//! +-----+--------------------+-------------+-------------+
//! | dir |        size        |    type     |   number    |
//! +-----+--------------------+-------------+-------------+
//! ```
//!
//! The layout is fixed by the kernel ABI. Callers keep every field in range;
//! out-of-range values are masked, never rejected.

pub const IOC_NRBITS: u32 = 8;
pub const IOC_TYPEBITS: u32 = 8;
pub const IOC_SIZEBITS: u32 = 14;
pub const IOC_DIRBITS: u32 = 2;

pub const IOC_NRSHIFT: u32 = 0;
pub const IOC_TYPESHIFT: u32 = IOC_NRSHIFT + IOC_NRBITS;
pub const IOC_SIZESHIFT: u32 = IOC_TYPESHIFT + IOC_TYPEBITS;
pub const IOC_DIRSHIFT: u32 = IOC_SIZESHIFT + IOC_SIZEBITS;

/// No data transfer.
pub const IOC_NONE: u32 = 0;
/// Userspace writes, kernel reads.
pub const IOC_WRITE: u32 = 1;
/// Kernel writes, userspace reads.
pub const IOC_READ: u32 = 2;

const fn mask(bits: u32) -> u32 {
    (1 << bits) - 1
}

/// Pack a command word from direction, type (magic), number and payload size.
pub const fn ioc(dir: u32, ty: u8, nr: u8, size: usize) -> u32 {
    ((dir & mask(IOC_DIRBITS)) << IOC_DIRSHIFT)
        | (((size as u32) & mask(IOC_SIZEBITS)) << IOC_SIZESHIFT)
        | ((ty as u32) << IOC_TYPESHIFT)
        | ((nr as u32) << IOC_NRSHIFT)
}

/// `_IO(type, nr)`
pub const fn io(ty: u8, nr: u8) -> u32 {
    ioc(IOC_NONE, ty, nr, 0)
}

/// `_IOR(type, nr, size)`
pub const fn ior(ty: u8, nr: u8, size: usize) -> u32 {
    ioc(IOC_READ, ty, nr, size)
}

/// `_IOW(type, nr, size)`
pub const fn iow(ty: u8, nr: u8, size: usize) -> u32 {
    ioc(IOC_WRITE, ty, nr, size)
}

/// `_IOWR(type, nr, size)`
pub const fn iowr(ty: u8, nr: u8, size: usize) -> u32 {
    ioc(IOC_READ | IOC_WRITE, ty, nr, size)
}
