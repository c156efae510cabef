// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Engine-level tests exercising the evaluation protocol with
//! purpose-built probe blocks, independent of the domain plug-ins.

#[cfg(test)]
mod tests {
    use crate::config::Settings;
    use crate::engine::{EvalScope, Evaluator};
    use crate::errors::EvalError;
    use crate::gis::Geometry;
    use crate::protocol::{GeometryMode, GeometryRequest, Request, Value};
    use crate::traits::{Block, BlockRef, BlockToken, PlannedInput};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn request() -> Request {
        GeometryRequest::new(
            GeometryMode::Intersects,
            Geometry::rect(0.0, 0.0, 100.0, 100.0),
            "EPSG:28992",
        )
        .into()
    }

    fn evaluator() -> Evaluator {
        Evaluator::new(Settings::default())
    }

    /// Leaf block producing a number, counting `combine` invocations.
    /// The token is caller-supplied so structurally-equal probes can be
    /// constructed independently.
    #[derive(Debug)]
    struct Probe {
        token: BlockToken,
        value: f64,
        delay: Duration,
        combines: Arc<AtomicUsize>,
    }

    impl Probe {
        fn new(id: &str, value: f64, combines: Arc<AtomicUsize>) -> Arc<Self> {
            Arc::new(Self {
                token: BlockToken::compose("probe", [id]),
                value,
                delay: Duration::from_millis(5),
                combines,
            })
        }
    }

    #[async_trait]
    impl Block for Probe {
        fn kind(&self) -> &'static str {
            "probe"
        }

        fn token(&self) -> &BlockToken {
            &self.token
        }

        async fn plan(
            &self,
            _request: &Request,
            _scope: &EvalScope,
        ) -> Result<Vec<PlannedInput>, EvalError> {
            tokio::time::sleep(self.delay).await;
            Ok(vec![])
        }

        fn combine(&self, _inputs: Vec<Value>) -> Result<Value, EvalError> {
            self.combines.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Number(self.value))
        }
    }

    /// Inner node fanning out to a fixed list of (input, sub-request)
    /// pairs and collecting the numbers it gets back, in order.
    #[derive(Debug)]
    struct Fanout {
        token: BlockToken,
        inputs: Vec<PlannedInput>,
    }

    impl Fanout {
        fn new(id: &str, inputs: Vec<PlannedInput>) -> Arc<Self> {
            Arc::new(Self {
                token: BlockToken::compose("fanout", [id]),
                inputs,
            })
        }
    }

    #[async_trait]
    impl Block for Fanout {
        fn kind(&self) -> &'static str {
            "fanout"
        }

        fn token(&self) -> &BlockToken {
            &self.token
        }

        async fn plan(
            &self,
            _request: &Request,
            _scope: &EvalScope,
        ) -> Result<Vec<PlannedInput>, EvalError> {
            Ok(self.inputs.clone())
        }

        fn combine(&self, inputs: Vec<Value>) -> Result<Value, EvalError> {
            let collected = inputs
                .into_iter()
                .map(|v| match v {
                    Value::Number(n) => Ok(n as i64),
                    Value::Time(ns) => Ok(ns.iter().sum()),
                    other => Err(EvalError::fault(
                        "fanout",
                        format!("unexpected input shape {}", other.shape_name()),
                    )),
                })
                .collect::<Result<Vec<i64>, _>>()?;
            Ok(Value::Time(collected))
        }
    }

    /// Leaf that always fails planning.
    #[derive(Debug)]
    struct Failing {
        token: BlockToken,
    }

    #[async_trait]
    impl Block for Failing {
        fn kind(&self) -> &'static str {
            "failing"
        }

        fn token(&self) -> &BlockToken {
            &self.token
        }

        async fn plan(
            &self,
            _request: &Request,
            _scope: &EvalScope,
        ) -> Result<Vec<PlannedInput>, EvalError> {
            Err(EvalError::request("failing", "unsupported mode"))
        }

        fn combine(&self, _inputs: Vec<Value>) -> Result<Value, EvalError> {
            unreachable!("plan always fails")
        }
    }

    #[tokio::test]
    async fn diamond_combines_shared_child_once() {
        let combines = Arc::new(AtomicUsize::new(0));
        let shared = Probe::new("s", 7.0, combines.clone());
        let left = Fanout::new(
            "left",
            vec![PlannedInput::evaluate(shared.clone() as BlockRef, request())],
        );
        let right = Fanout::new(
            "right",
            vec![PlannedInput::evaluate(shared.clone() as BlockRef, request())],
        );
        let root = Fanout::new(
            "root",
            vec![
                PlannedInput::evaluate(left as BlockRef, request()),
                PlannedInput::evaluate(right as BlockRef, request()),
            ],
        );

        let result = evaluator().evaluate(root, request()).await.unwrap();
        assert_eq!(result, Value::Time(vec![7, 7]));
        assert_eq!(combines.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn structurally_equal_blocks_share_a_cache_entry() {
        let combines = Arc::new(AtomicUsize::new(0));
        // Two independently constructed probes with equal kind and args.
        let first = Probe::new("same", 3.0, combines.clone());
        let second = Probe::new("same", 3.0, combines.clone());
        assert_eq!(first.token(), second.token());

        let root = Fanout::new(
            "root",
            vec![
                PlannedInput::evaluate(first as BlockRef, request()),
                PlannedInput::evaluate(second as BlockRef, request()),
            ],
        );

        let result = evaluator().evaluate(root, request()).await.unwrap();
        assert_eq!(result, Value::Time(vec![3, 3]));
        assert_eq!(combines.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_requests_are_distinct_cache_keys() {
        let combines = Arc::new(AtomicUsize::new(0));
        let probe = Probe::new("p", 1.0, combines.clone());

        let narrow: Request = GeometryRequest::new(
            GeometryMode::Intersects,
            Geometry::rect(0.0, 0.0, 1.0, 1.0),
            "EPSG:28992",
        )
        .into();
        let root = Fanout::new(
            "root",
            vec![
                PlannedInput::evaluate(probe.clone() as BlockRef, request()),
                PlannedInput::evaluate(probe as BlockRef, narrow),
            ],
        );

        evaluator().evaluate(root, request()).await.unwrap();
        assert_eq!(combines.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn combine_receives_inputs_in_plan_order() {
        let combines = Arc::new(AtomicUsize::new(0));
        // The slow probe is planned first; its result must still arrive
        // first even though the fast sibling resolves earlier.
        let slow = Arc::new(Probe {
            token: BlockToken::compose("probe", ["slow"]),
            value: 1.0,
            delay: Duration::from_millis(40),
            combines: combines.clone(),
        });
        let fast = Arc::new(Probe {
            token: BlockToken::compose("probe", ["fast"]),
            value: 2.0,
            delay: Duration::from_millis(0),
            combines,
        });

        let root = Fanout::new(
            "root",
            vec![
                PlannedInput::evaluate(slow as BlockRef, request()),
                PlannedInput::evaluate(fast as BlockRef, request()),
            ],
        );

        let result = evaluator().evaluate(root, request()).await.unwrap();
        assert_eq!(result, Value::Time(vec![1, 2]));
    }

    #[tokio::test]
    async fn literal_passthrough_skips_all_blocks() {
        let value = Value::Geometry(Geometry::rect(1.0, 2.0, 3.0, 4.0));
        let resolved = evaluator()
            .resolve(PlannedInput::literal(value.clone()))
            .await
            .unwrap();
        assert_eq!(resolved, value);
    }

    #[tokio::test]
    async fn literal_inputs_reach_combine_untouched() {
        let root = Fanout::new(
            "root",
            vec![
                PlannedInput::literal(Value::Number(9.0)),
                PlannedInput::literal(Value::Number(8.0)),
            ],
        );
        let result = evaluator().evaluate(root, request()).await.unwrap();
        assert_eq!(result, Value::Time(vec![9, 8]));
    }

    #[tokio::test]
    async fn concurrent_fanout_to_one_key_runs_single_flight() {
        let combines = Arc::new(AtomicUsize::new(0));
        let shared = Probe::new("hot", 5.0, combines.clone());
        let inputs: Vec<PlannedInput> = (0..16)
            .map(|_| PlannedInput::evaluate(shared.clone() as BlockRef, request()))
            .collect();
        let root = Fanout::new("root", inputs);

        let result = evaluator().evaluate(root, request()).await.unwrap();
        assert_eq!(result, Value::Time(vec![5; 16]));
        assert_eq!(combines.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn plan_errors_abort_the_whole_call() {
        let failing = Arc::new(Failing {
            token: BlockToken::compose("failing", ["f"]),
        });
        let combines = Arc::new(AtomicUsize::new(0));
        let healthy = Probe::new("h", 1.0, combines);
        let root = Fanout::new(
            "root",
            vec![
                PlannedInput::evaluate(failing as BlockRef, request()),
                PlannedInput::evaluate(healthy as BlockRef, request()),
            ],
        );

        let err = evaluator().evaluate(root, request()).await.unwrap_err();
        assert!(matches!(err, EvalError::Request { kind: "failing", .. }));
    }

    #[tokio::test]
    async fn results_are_deterministic_across_calls() {
        let combines = Arc::new(AtomicUsize::new(0));
        let probe = Probe::new("d", 11.0, combines.clone());
        let root = Fanout::new(
            "root",
            vec![PlannedInput::evaluate(probe as BlockRef, request())],
        );

        let evaluator = evaluator();
        let first = evaluator.evaluate(root.clone(), request()).await.unwrap();
        let second = evaluator.evaluate(root, request()).await.unwrap();
        assert_eq!(first, second);
        // The cache is call-scoped: the second call recomputes.
        assert_eq!(combines.load(Ordering::SeqCst), 2);
    }
}
