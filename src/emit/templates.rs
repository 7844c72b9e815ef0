//! Per-backend template tables.
//!
//! One string template per operator variant, parameterized with
//! `{out}`, `{in}`, `{class}`, `{expr}` and friends. `render` substitutes
//! the named parameters; braces that are not a known parameter (Scala
//! blocks, pattern matches) pass through untouched.

use crate::backend::Backend;
use crate::error::BackendError;

/// Substitute `{key}` placeholders in a template.
pub fn render(template: &str, params: &[(&str, String)]) -> String {
    let mut out = template.to_string();
    for (key, value) in params {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

/// Template table of one backend.
pub struct BackendTemplates {
    backend: Backend,
}

impl BackendTemplates {
    pub fn new(backend: Backend) -> Self {
        BackendTemplates { backend }
    }

    /// Imports header of the emitted program.
    pub fn header(&self) -> &'static str {
        match self.backend {
            Backend::Spark => {
                "import org.apache.spark.SparkContext\n\
                 import org.apache.spark.SparkContext._\n\
                 import org.apache.spark.SparkConf\n\
                 import org.apache.spark.rdd._\n\
                 import org.apache.spark.storage.StorageLevel\n"
            }
            Backend::FlinkStreaming => {
                "import org.apache.flink.streaming.api.scala._\n\
                 import org.apache.flink.streaming.api.windowing.windows._\n\
                 import org.apache.flink.util.Collector\n"
            }
        }
    }

    /// Opening of the `main` wrapper, parameterized with `{name}`.
    pub fn main_open(&self) -> &'static str {
        match self.backend {
            Backend::Spark => {
                "object {name} {\n\
                 \x20 def main(args: Array[String]) {\n\
                 \x20   val conf = new SparkConf().setAppName(\"{name}_App\")\n\
                 \x20   val sc = new SparkContext(conf)\n"
            }
            Backend::FlinkStreaming => {
                "object {name} {\n\
                 \x20 def main(args: Array[String]) {\n\
                 \x20   val env = StreamExecutionEnvironment.getExecutionEnvironment\n"
            }
        }
    }

    /// Line installing the performance listener, parameterized with `{url}`.
    pub fn perf_listener(&self) -> &'static str {
        match self.backend {
            Backend::Spark => {
                "    sc.addSparkListener(new PerfMonitor(\"{url}\"))\n"
            }
            Backend::FlinkStreaming => {
                "    PerfMonitor.init(\"{url}\")\n"
            }
        }
    }

    /// Closing of the `main` wrapper.
    pub fn main_close(&self) -> &'static str {
        match self.backend {
            Backend::Spark => "    sc.stop()\n  }\n}\n",
            Backend::FlinkStreaming => "    env.execute(\"{name}_App\")\n  }\n}\n",
        }
    }

    /// Snippet template for an operator tag.
    pub fn for_op(&self, tag: &str) -> Result<&'static str, BackendError> {
        let template = match (self.backend, tag) {
            (Backend::Spark, "LOAD") => {
                "val {out} = sc.textFile(\"{file}\").map(line => {class}.fromLine(line))"
            }
            (Backend::Spark, "FILTER") => "val {out} = {in}.filter(t => {pred})",
            (Backend::Spark, "FOREACH") => "val {out} = {in}.map(t => {class}({exprs}))",
            (Backend::Spark, "GROUPBY") => {
                "val {out} = {in}.groupBy(t => {key}).map{case (k, v) => {class}(k, v)}"
            }
            (Backend::Spark, "GROUPALL") => {
                "val {out} = {in}.glom.map(a => {class}(\"all\", a))"
            }
            (Backend::Spark, "JOIN") => {
                "val {out} = {keyed}.map{case (k, ({fields})) => {class}({flat})}"
            }
            (Backend::Spark, "UNION") => "val {out} = {in}{rest}",
            (Backend::Spark, "DISTINCT") => "val {out} = {in}.distinct",
            (Backend::Spark, "ORDERBY") => {
                "val {out} = {in}.sortBy(t => {key}, ascending = {asc})"
            }
            (Backend::Spark, "LIMIT") => "val {out} = sc.parallelize({in}.take({n}))",
            (Backend::Spark, "SPLIT") => "val {out} = {in}.filter(t => {pred})",
            (Backend::Spark, "STORE") => "{in}.saveAsTextFile(\"{file}\")",
            (Backend::Spark, "DUMP") => "{in}.collect.foreach(t => println(t))",
            (Backend::Spark, "CACHE") => "val {out} = {in}.persist(StorageLevel.{mode})",
            (Backend::Spark, "TIMING") => {
                "val {out} = {in}.mapPartitionsWithIndex((pid, it) => PerfMonitor.observe(\"{lineage}\", pid, it))"
            }
            (Backend::Spark, "MATCHER") => {
                "val {out} = {in}.mapPartitions(it => {controller}.run(it))"
            }

            (Backend::FlinkStreaming, "LOAD") => {
                "val {out} = env.readTextFile(\"{file}\").map(line => {class}.fromLine(line))"
            }
            (Backend::FlinkStreaming, "FILTER") => "val {out} = {in}.filter(t => {pred})",
            (Backend::FlinkStreaming, "FOREACH") => {
                "val {out} = {in}.map(t => {class}({exprs}))"
            }
            (Backend::FlinkStreaming, "WINDOW") => "val {out} = {in}{window}",
            (Backend::FlinkStreaming, "WINDOWAPPLY") => {
                "val {out} = {in}{window}.apply((win, it, coll: Collector[{class}]) => {body})"
            }
            (Backend::FlinkStreaming, "GROUPBY") => "val {out} = {in}.keyBy(t => {key})",
            (Backend::FlinkStreaming, "UNION") => "val {out} = {in}{rest}",
            (Backend::FlinkStreaming, "DISTINCT") => {
                "val {out} = {in}.keyBy(t => t).flatMap(new DistinctEmitter())"
            }
            (Backend::FlinkStreaming, "STORE") => "{in}.writeAsText(\"{file}\")",
            (Backend::FlinkStreaming, "DUMP") => "{in}.print()",
            (Backend::FlinkStreaming, "MATCHER") => {
                "val {out} = {in}.flatMap(t => {controller}.advance(t))"
            }
            (Backend::FlinkStreaming, "TIMING") => {
                "val {out} = {in}.map(t => PerfMonitor.tag(\"{lineage}\", t))"
            }

            (backend, tag) => {
                return Err(BackendError::MissingTemplate {
                    backend: backend.name().to_string(),
                    operator: tag.to_string(),
                })
            }
        };
        Ok(template)
    }
}
