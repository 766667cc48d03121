//! `/dev/nsm` transport.
//!
//! One request is one ioctl carrying two iovecs: the encoded request and a
//! fixed-capacity response buffer. The kernel reports how many response
//! bytes it wrote by updating the response iovec length.

use a3s_attest_core::error::{AttestError, Result};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::ioctl::iowr;

/// ioctl magic of the NSM driver.
pub const NSM_IOCTL_MAGIC: u8 = 0x0A;

/// Largest request the driver accepts.
pub const NSM_REQUEST_MAX_SIZE: usize = 0x1000;

/// Response buffer capacity (3x the request ceiling).
pub const NSM_RESPONSE_MAX_SIZE: usize = 3 * NSM_REQUEST_MAX_SIZE;

/// `struct nsm_message` from the NSM kernel driver.
#[repr(C)]
struct NsmMessage {
    request: libc::iovec,
    response: libc::iovec,
}

/// `_IOWR(0x0A, 0, struct nsm_message)`
pub const NSM_IOCTL_REQUEST: u32 = iowr(NSM_IOCTL_MAGIC, 0, std::mem::size_of::<NsmMessage>());

// ioctl request type varies between glibc and musl
#[cfg(target_env = "musl")]
type IoctlRequest = libc::c_int;
#[cfg(not(target_env = "musl"))]
type IoctlRequest = libc::c_ulong;

/// Raw request/response exchange with the security module.
pub trait NsmTransport {
    fn send(&mut self, request: &[u8]) -> Result<Vec<u8>>;
}

/// Open handle to the NSM character device.
#[derive(Debug)]
pub struct NsmDevice {
    file: File,
    path: PathBuf,
}

impl NsmDevice {
    /// Open the device read/write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    AttestError::Unsupported(format!(
                        "{} not found (is this a Nitro Enclave?)",
                        path.display()
                    ))
                } else {
                    AttestError::DeviceIo {
                        operation: "open".to_string(),
                        message: format!("{}: {}", path.display(), e),
                    }
                }
            })?;

        tracing::debug!(path = %path.display(), "Opened NSM device");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the device handle.
    pub fn close(self) {
        drop(self.file);
    }
}

impl NsmTransport for NsmDevice {
    fn send(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        if request.len() > NSM_REQUEST_MAX_SIZE {
            return Err(AttestError::InputTooLarge {
                len: request.len(),
                max: NSM_REQUEST_MAX_SIZE,
            });
        }

        let mut response = vec![0u8; NSM_RESPONSE_MAX_SIZE];
        let len = ioctl_exchange(&self.file, request, &mut response)?;
        response.truncate(len.min(NSM_RESPONSE_MAX_SIZE));
        Ok(response)
    }
}

#[cfg(target_os = "linux")]
fn ioctl_exchange(file: &File, request: &[u8], response: &mut [u8]) -> Result<usize> {
    use std::os::fd::AsRawFd;

    let mut msg = NsmMessage {
        request: libc::iovec {
            iov_base: request.as_ptr() as *mut libc::c_void,
            iov_len: request.len(),
        },
        response: libc::iovec {
            iov_base: response.as_mut_ptr() as *mut libc::c_void,
            iov_len: response.len(),
        },
    };

    // The driver only reads the request buffer and writes at most
    // `response.len()` bytes into the response buffer.
    let ret = unsafe {
        libc::ioctl(
            file.as_raw_fd(),
            NSM_IOCTL_REQUEST as IoctlRequest,
            &mut msg as *mut NsmMessage,
        )
    };

    if ret != 0 {
        let errno = std::io::Error::last_os_error();
        return Err(AttestError::DeviceIo {
            operation: "ioctl".to_string(),
            message: format!("NSM ioctl failed: {}", errno),
        });
    }

    Ok(msg.response.iov_len)
}

#[cfg(not(target_os = "linux"))]
fn ioctl_exchange(_file: &File, _request: &[u8], _response: &mut [u8]) -> Result<usize> {
    Err(AttestError::Unsupported(
        "NSM device is only available on Linux".to_string(),
    ))
}
