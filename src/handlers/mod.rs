pub mod xmlrpc;
pub mod zenoss;
