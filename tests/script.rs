// Copyright 2018 Kyle Mayes
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::process::{Command};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration};

use handoff::ConsumeError;
use handoff::rendezvous;
use handoff::script::{Phase, Script, ScriptError, Wait, SENTINEL, WORDS};

fn fast() -> Script {
    Script::new().pause(Duration::from_millis(0))
}

fn lines(out: Vec<u8>) -> Vec<String> {
    String::from_utf8(out).unwrap().lines().map(|l| l.to_string()).collect()
}

#[test]
fn prints_words_in_cyclic_order() {
    let mut out = vec![];
    let report = fast().run(&mut out).unwrap();
    assert_eq!(report.received, 60);
    assert_eq!(report.discarded, 0);

    let lines = lines(out);
    assert_eq!(lines.len(), 60);
    assert_eq!(lines[0], "0 -- Here's the string: [This]");
    assert_eq!(lines[59], "59 -- Here's the string: [...]");
    for (index, line) in lines.iter().enumerate() {
        assert_eq!(*line, format!("{} -- Here's the string: [{}]", index, WORDS[index % 6]));
    }
    assert!(lines.iter().all(|l| !l.contains(SENTINEL)));
}

#[test]
fn sentinel_received_once_after_words() {
    let script = fast();
    let (producer, consumer) = rendezvous::channel();
    let handle = script.spawn(producer).unwrap();

    let mut out = vec![];
    let report = script.consume(&consumer, &mut out).unwrap();
    assert_eq!(report.received, 60);

    // The producer is finished once the sentinel has been taken.
    assert_eq!(handle.join().unwrap().unwrap(), 60);
    assert_eq!(consumer.consume(), Err(ConsumeError::Disconnected));
}

#[test]
fn pacing_bounds_elapsed_time() {
    let pause = Duration::from_millis(5);
    let mut out = vec![];
    let report = Script::new().pause(pause).run(&mut out).unwrap();
    assert!(report.elapsed >= pause * 60, "elapsed: {:?}", report.elapsed);
}

#[test]
fn extra_receive_consumes_sentinel_and_stalls() {
    let mut out = vec![];
    let error = fast().receives(61).run(&mut out).unwrap_err();
    match error {
        ScriptError::Consume { phase, received, source } => {
            assert_eq!(phase, Phase::AwaitingSentinel);
            assert_eq!(received, 61);
            assert_eq!(source, ConsumeError::Disconnected);
        },
        other => panic!("unexpected error: {:?}", other),
    }

    let lines = lines(out);
    assert_eq!(lines.len(), 61);
    assert_eq!(lines[60], "60 -- Here's the string: [done]");
}

#[test]
fn bounded_wait_reports_timeout() {
    let (producer, consumer) = rendezvous::channel();
    let barrier = Arc::new(Barrier::new(2));
    let gate = barrier.clone();
    let handle = thread::spawn(move || {
        for word in WORDS.iter().cycle().take(60) {
            producer.produce(word.to_string()).unwrap();
        }
        // Stay connected without ever sending the sentinel.
        gate.wait();
    });

    let mut out = vec![];
    let script = fast().wait(Wait::Within(Duration::from_millis(500)));
    match script.consume(&consumer, &mut out) {
        Err(ScriptError::Consume { phase: Phase::AwaitingSentinel, received: 60, source }) => {
            assert_eq!(source, ConsumeError::Timeout);
        },
        other => panic!("unexpected result: {:?}", other),
    }
    barrier.wait();
    assert_eq!(lines(out).len(), 60);
    handle.join().unwrap();
}

#[test]
fn discards_values_before_sentinel() {
    let (producer, consumer) = rendezvous::channel();
    let handle = thread::spawn(move || {
        for value in &["a", "b", "stray", SENTINEL] {
            producer.produce(value.to_string()).unwrap();
        }
    });

    let mut out = vec![];
    let script = fast().words(vec!["a", "b"]).rounds(1);
    let report = script.consume(&consumer, &mut out).unwrap();
    assert_eq!(report.received, 2);
    assert_eq!(report.discarded, 1);
    assert_eq!(lines(out), vec!["0 -- Here's the string: [a]", "1 -- Here's the string: [b]"]);
    handle.join().unwrap();
}

#[test]
fn custom_sentinel() {
    let mut out = vec![];
    let script = fast().words(vec!["x"]).rounds(3).sentinel("stop");
    let report = script.run(&mut out).unwrap();
    assert_eq!(report.received, 3);
    assert_eq!(lines(out)[2], "2 -- Here's the string: [x]");
}

#[test]
fn status_reflects_outcome() {
    let mut out = vec![];
    assert_eq!(fast().status(&mut out), 0);
    assert_eq!(lines(out).len(), 60);

    let mut out = vec![];
    assert_eq!(fast().receives(61).status(&mut out), 1);
    assert_eq!(lines(out).len(), 61);
}

#[test]
#[ignore = "paces sixty one-second sends"]
fn binary_exits_after_sentinel() {
    let output = Command::new(env!("CARGO_BIN_EXE_handoff")).output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines = stdout.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 60);
    assert_eq!(lines[0], "0 -- Here's the string: [This]");
    assert_eq!(lines[59], "59 -- Here's the string: [...]");
}
