#[cfg(unix)]
mod unix_socket;
