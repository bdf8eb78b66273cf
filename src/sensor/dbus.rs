pub mod busctl_source;
