use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, VecDeque},
    net::IpAddr,
};

use crate::{
    error::QueryError,
    gateway::{DnsGateway, QueryType},
};

pub(crate) type Key = (Option<IpAddr>, String, QueryType);

/// Gateway answering from a script. Each key holds a queue of answers; the
/// last one repeats once the queue is drained. Unscripted queries get an
/// empty answer.
#[derive(Default)]
pub(crate) struct ScriptedGateway {
    script: RefCell<HashMap<Key, VecDeque<Vec<String>>>>,
    log: RefCell<Vec<Key>>,
    releases: Cell<usize>,
}

impl ScriptedGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn answer(
        self,
        server: Option<&str>,
        name: &str,
        qtype: QueryType,
        answers: &[&str],
    ) -> Self {
        let key = (server.map(ip), name.to_owned(), qtype);
        self.script
            .borrow_mut()
            .entry(key)
            .or_default()
            .push_back(answers.iter().map(|a| a.to_string()).collect());
        self
    }

    pub(crate) fn nsec(self, server: &str, name: &str, next: &str) -> Self {
        self.answer(Some(server), name, QueryType::Nsec, &[next])
    }

    pub(crate) fn nsec_failure(self, server: &str, name: &str) -> Self {
        self.answer(Some(server), name, QueryType::Nsec, &[])
    }

    pub(crate) fn releases(&self) -> usize {
        self.releases.get()
    }

    /// Every query seen so far, in order.
    pub(crate) fn log(&self) -> Vec<Key> {
        self.log.borrow().clone()
    }
}

impl DnsGateway for ScriptedGateway {
    fn query(
        &self,
        server: Option<IpAddr>,
        name: &str,
        qtype: QueryType,
    ) -> Result<Vec<String>, QueryError> {
        let key = (server, name.to_owned(), qtype);
        self.log.borrow_mut().push(key.clone());
        let mut script = self.script.borrow_mut();
        let answers = match script.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            None => Vec::new(),
        };
        Ok(answers)
    }

    fn release_servers(&self) {
        self.releases.set(self.releases.get() + 1);
    }
}

pub(crate) fn ip(addr: &str) -> IpAddr {
    addr.parse().expect("test address")
}
