//! Exit status codes for the configuration tool.
//! reference: [SYSEXITS](https://man.freebsd.org/cgi/man.cgi?query=sysexits&apropos=0&sektion=0&manpath=FreeBSD+11.2-stable&arch=default&format=html)

/// value: 66 <br>
/// The configuration file does not exist or could not be opened.
pub const EX_NOINPUT: i32 = 66;

/// value: 70 <br>
/// The archiver's argument parser could not be introspected.
pub const EX_SOFTWARE: i32 = 70;

/// value: 73 <br>
/// The sample configuration file cannot be created, usually because it already exists.
pub const EX_CANTCREAT: i32 = 73;

/// value: 74 <br>
/// Reading or writing a configuration file failed.
pub const EX_IOERR: i32 = 74;

/// value: 78 <br>
/// The configuration file is malformed or does not match the archiver's options.
pub const EX_CONFIG: i32 = 78;
