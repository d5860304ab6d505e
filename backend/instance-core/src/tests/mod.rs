mod activation;
mod config;
mod listener;
mod support;
