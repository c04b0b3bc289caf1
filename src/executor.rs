//! Record-at-a-time serial executor.
//!
//! Runs a verb chain on the calling thread: each input envelope is pushed
//! through every verb before the next one is read. Cancellation links are
//! wired exactly as in the concurrent [`Chain`](crate::chain::Chain), so a
//! verb that asks upstream to stop ends input consumption here too. Output
//! is identical to the concurrent chain's for the same verbs and input.

use crate::chain::cancel_links;
use crate::context::{Batch, Context, Envelope};
use crate::verb::{CancelLink, Emitter, Verb};

/// Push envelopes through a slice of verbs, one verb at a time.
fn push_through_verbs(
    envelopes: Batch,
    verbs: &mut [Box<dyn Verb>],
    links: &mut [CancelLink],
) -> Batch {
    let mut current = envelopes;
    for (verb, link) in verbs.iter_mut().zip(links.iter_mut()) {
        let mut out = Emitter::collecting();
        for envelope in current {
            match envelope {
                Envelope::Text(..) => out.emit(envelope),
                envelope => verb.transform(envelope, &mut out, link),
            }
        }
        current = out.take();
    }
    current
}

/// Execute a verb chain in record-at-a-time mode.
///
/// `input` should end with one end-of-stream envelope; if it does not, or if
/// a verb cancels input early, one is supplied carrying the last context
/// seen. The returned batch ends with exactly one end-of-stream envelope.
pub fn run_serial<I>(input: I, verbs: &mut [Box<dyn Verb>]) -> Batch
where
    I: IntoIterator<Item = Envelope>,
{
    let (source_stop, mut links, _sink_stop) = cancel_links(verbs.len());
    let mut output = Vec::new();
    let mut last_context = Context::new();

    for envelope in input {
        if source_stop.try_recv().is_ok() {
            break;
        }
        let end = envelope.is_end_of_stream();
        last_context = envelope.context().clone();
        output.extend(push_through_verbs(vec![envelope], verbs, &mut links));
        if end {
            return output;
        }
    }

    let eos = Envelope::EndOfStream(last_context);
    output.extend(push_through_verbs(vec![eos], verbs, &mut links));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{CHANNEL_CAPACITY, Chain};
    use crate::record::Record;
    use crate::value::Value;
    use crate::verbs::build_chain;
    use crossbeam_channel::bounded;
    use std::thread;

    fn envelopes(count: u64) -> Vec<Envelope> {
        let mut ctx = Context::new();
        ctx.start_file("input.dkvp");
        let mut out = Vec::new();
        for i in 0..count {
            let shape = ["pan", "eks", "wye"][(i % 3) as usize];
            let mut r = Record::new();
            r.put("a", Value::from_data(shape));
            r.put("i", Value::from_data(i.to_string()));
            if i % 2 == 0 {
                r.put("x", Value::from_data(format!("{}", (i * 7) % 10)));
            }
            out.push(Envelope::Record(r, ctx.advance()));
        }
        out.push(Envelope::EndOfStream(ctx));
        out
    }

    fn render(batch: &[Envelope]) -> String {
        batch
            .iter()
            .map(|e| match e {
                Envelope::Record(r, _) => r.to_string(),
                Envelope::Text(t, _) => format!("text:{t}"),
                Envelope::EndOfStream(_) => "<eos>".to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn parse_chain(chain: &str) -> Vec<Box<dyn Verb>> {
        let segments: Vec<Vec<String>> = chain
            .split(" then ")
            .map(|seg| seg.split_whitespace().map(str::to_string).collect())
            .collect();
        build_chain(&segments).unwrap()
    }

    fn run_serial_str(chain: &str, count: u64) -> String {
        let mut verbs = parse_chain(chain);
        render(&run_serial(envelopes(count), &mut verbs))
    }

    /// Run the concurrent chain, feeding input in batches of `batch_size`
    /// from a producer thread that honors cancellation.
    fn run_concurrent_str(chain: &str, count: u64, batch_size: usize) -> String {
        let verbs = parse_chain(chain);
        let (source_stop, links, _sink_stop) = cancel_links(verbs.len());
        let (tx, rx) = bounded(CHANNEL_CAPACITY);
        let (chain, out) = Chain::spawn(verbs, rx, links, batch_size).unwrap();
        let input = envelopes(count);
        let producer = thread::spawn(move || {
            let mut iter = input.into_iter().peekable();
            let mut last = Context::new();
            loop {
                let mut batch = Vec::new();
                while batch.len() < batch_size {
                    match iter.next() {
                        Some(e) => {
                            last = e.context().clone();
                            batch.push(e);
                        }
                        None => break,
                    }
                }
                let end = iter.peek().is_none();
                if source_stop.try_recv().is_ok() && !end {
                    batch.push(Envelope::EndOfStream(last.clone()));
                    let _ = tx.send(batch);
                    return;
                }
                if tx.send(batch).is_err() || end {
                    return;
                }
            }
        });
        let result: Vec<Envelope> = out.iter().flatten().collect();
        producer.join().unwrap();
        chain.join();
        render(&result)
    }

    macro_rules! equiv_test {
        ($name:ident, $chain:expr) => {
            #[test]
            fn $name() {
                let serial = run_serial_str($chain, 40);
                for batch_size in [1, 3, 500] {
                    let concurrent = run_concurrent_str($chain, 40, batch_size);
                    assert_eq!(
                        serial, concurrent,
                        "concurrent output differs from serial for {:?} at batch size {}",
                        $chain, batch_size
                    );
                }
            }
        };
    }

    // --- Unit tests ---

    #[test]
    fn test_empty_chain_is_identity() {
        let out = run_serial(envelopes(3), &mut []);
        assert_eq!(out.len(), 4);
        assert!(out[3].is_end_of_stream());
    }

    #[test]
    fn test_missing_end_of_stream_is_supplied() {
        let mut input = envelopes(2);
        input.pop();
        let mut verbs = parse_chain("tac");
        let out = run_serial(input, &mut verbs);
        assert_eq!(render(&out), "a=eks,i=1\na=pan,i=0,x=0\n<eos>");
        assert_eq!(out[2].context().nr, 2);
    }

    #[test]
    fn test_exactly_one_end_of_stream() {
        for chain in ["cat", "tac then head -n 2", "seqgen --stop 5 then tac", "count -g a"] {
            let out = run_serial(envelopes(10), &mut parse_chain(chain));
            let eos = out.iter().filter(|e| e.is_end_of_stream()).count();
            assert_eq!(eos, 1, "{chain}");
            assert!(out.last().is_some_and(Envelope::is_end_of_stream), "{chain}");
        }
    }

    #[test]
    fn test_head_stops_input_consumption() {
        let mut verbs = parse_chain("head -n 2");
        let mut consumed = 0;
        let input = envelopes(1000).into_iter().inspect(|_| consumed += 1);
        let out = run_serial(input, &mut verbs);
        assert_eq!(out.len(), 3);
        assert!(consumed < 10, "consumed {consumed} envelopes");
    }

    #[test]
    fn test_stateless_chain_preserves_order() {
        let out = run_serial_str("cat then cut -f i", 5);
        assert_eq!(out, "i=0\ni=1\ni=2\ni=3\ni=4\n<eos>");
    }

    // --- Serial / concurrent equivalence ---

    equiv_test!(test_equiv_cat, "cat -n -g a");
    equiv_test!(test_equiv_head, "head -n 4");
    equiv_test!(test_equiv_grouped_head, "head -n 2 -g a");
    equiv_test!(test_equiv_tac, "tac");
    equiv_test!(test_equiv_group_like, "group-like");
    equiv_test!(test_equiv_sort, "sort -f a -nr i");
    equiv_test!(test_equiv_count, "count -g a");
    equiv_test!(test_equiv_repeat, "repeat -n 3 then head -n 7");
    equiv_test!(test_equiv_put, "put $y=$i*2 then filter $y>10");
    equiv_test!(test_equiv_unsparsify, "unsparsify");
    equiv_test!(test_equiv_seqgen, "seqgen --stop 100 then head -n 5");
    equiv_test!(test_equiv_mixed, "cat then fill-empty then tail -n 2 -g a then sort-within-records");
}
