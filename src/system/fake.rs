use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::system::executor::BusctlRunner;

/// Scripted busctl. Replies are queued per call and replayed in order, the last one repeating.
/// Unscripted calls fail the way busctl does when the peer is missing.
#[derive(Default)]
pub struct FakeBusctl {
    replies: Mutex<HashMap<String, VecDeque<Result<String, String>>>>,
    calls: Mutex<Vec<String>>,
}

fn value_key(service: &str, path: &str) -> String {
    format!("get-property {} {}", service, path)
}

fn object_key(path: &str) -> String {
    format!("GetObject {}", path)
}

fn subtree_key(search_path: &str) -> String {
    format!("GetSubTree {}", search_path)
}

impl FakeBusctl {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, key: String, reply: Result<String, String>) -> Self {
        self.replies.lock().unwrap().entry(key).or_default().push_back(reply);
        self
    }

    /// Queue a `Sensor.Value` double reply.
    pub fn with_value(self, service: &str, path: &str, value: f64) -> Self {
        self.push(value_key(service, path), Ok(format!(r#"{{"type":"d","data":{}}}"#, value)))
    }

    pub fn with_value_error(self, service: &str, path: &str, stderr: &str) -> Self {
        self.push(value_key(service, path), Err(stderr.to_string()))
    }

    /// Queue a GetObject reply naming `service` as the owner of `path`.
    pub fn with_owner(self, path: &str, service: &str) -> Self {
        let reply = format!(
            r#"{{"type":"a{{sas}}","data":[{{"{}":["xyz.openbmc_project.Sensor.Value"]}}]}}"#,
            service
        );
        self.push(object_key(path), Ok(reply))
    }

    pub fn with_object_error(self, path: &str, stderr: &str) -> Self {
        self.push(object_key(path), Err(stderr.to_string()))
    }

    pub fn with_subtree(self, search_path: &str, reply: &str) -> Self {
        self.push(subtree_key(search_path), Ok(reply.to_string()))
    }

    pub fn with_subtree_error(self, search_path: &str, stderr: &str) -> Self {
        self.push(subtree_key(search_path), Err(stderr.to_string()))
    }

    /// Number of calls whose key starts with `prefix` (e.g. "GetObject").
    pub fn calls_to(&self, prefix: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn reply(&self, key: String) -> Result<String> {
        self.calls.lock().unwrap().push(key.clone());

        let mut replies = self.replies.lock().unwrap();
        let next = match replies.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        match next {
            Some(Ok(stdout)) => Ok(stdout),
            Some(Err(stderr)) => Err(anyhow!("busctl failed: {}", stderr)),
            None => Err(anyhow!("busctl failed: Unknown object '{}'", key)),
        }
    }
}

#[async_trait]
impl BusctlRunner for FakeBusctl {
    async fn get_value(&self, service: &str, path: &str) -> Result<String> {
        self.reply(value_key(service, path))
    }

    async fn get_object(&self, path: &str) -> Result<String> {
        self.reply(object_key(path))
    }

    async fn get_subtree(&self, search_path: &str) -> Result<String> {
        self.reply(subtree_key(search_path))
    }
}
