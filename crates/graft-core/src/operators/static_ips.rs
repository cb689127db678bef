/*
 * operators/static_ips.rs
 * Copyright (c) 2025 Posit, PBC
 */

use crate::cursor::Cursor;
use crate::node::Node;
use crate::operator::{Arg, OpContext, OpError, Operator, Phase, Response};
use std::net::Ipv4Addr;

/// `(( static_ips <offset>... ))`: static addresses for a job's instances.
///
/// The call must sit at `<jobs>.<job>.networks.<network>.static_ips`. The
/// job's `instances` count and the top-level `networks.<network>` subnets'
/// `static` ranges are read from the tree; the result holds the addresses at
/// the requested offsets into the flattened pool, one per instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticIps;

fn parse_address(text: &str) -> Result<Ipv4Addr, OpError> {
    text.trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| OpError(format!("`{}` is not a valid IPv4 address", text.trim())))
}

/// Inclusive address range, from `a - b` or a single address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Range {
    start: u32,
    end: u32,
}

impl Range {
    fn parse(text: &str) -> Result<Range, OpError> {
        let (start, end) = match text.split_once('-') {
            Some((start, end)) => (parse_address(start)?, parse_address(end)?),
            None => {
                let single = parse_address(text)?;
                (single, single)
            }
        };
        let (start, end) = (u32::from(start), u32::from(end));
        if end < start {
            return Err(OpError(format!("static range `{}` ends before it starts", text)));
        }
        Ok(Range { start, end })
    }

    fn len(&self) -> u64 {
        u64::from(self.end - self.start) + 1
    }
}

/// The static ranges of one network, in declaration order.
///
/// Offsets index into the concatenation of the ranges without expanding them.
#[derive(Debug, Default)]
struct Pool {
    ranges: Vec<Range>,
}

impl Pool {
    fn from_network(network: &Node, name: &str) -> Result<Pool, OpError> {
        let subnets = network
            .get("subnets")
            .and_then(Node::as_sequence)
            .ok_or_else(|| OpError(format!("network `{}` has no subnets", name)))?;

        let mut pool = Pool::default();
        for subnet in subnets {
            let ranges: Vec<&Node> = match subnet.get("static") {
                Some(Node::Sequence(items)) => items.iter().collect(),
                Some(single @ Node::Scalar(_)) if !single.is_null() => vec![single],
                _ => continue,
            };
            for range in ranges {
                let text = range.as_str().ok_or_else(|| {
                    OpError(format!(
                        "static range in network `{}` is a {}, not a string",
                        name,
                        range.kind()
                    ))
                })?;
                pool.ranges.push(Range::parse(text)?);
            }
        }
        Ok(pool)
    }

    fn len(&self) -> u64 {
        self.ranges.iter().map(Range::len).sum()
    }

    fn get(&self, offset: usize) -> Option<Ipv4Addr> {
        let mut remaining = u64::try_from(offset).ok()?;
        for range in &self.ranges {
            if remaining < range.len() {
                let address = u64::from(range.start) + remaining;
                return u32::try_from(address).ok().map(Ipv4Addr::from);
            }
            remaining -= range.len();
        }
        None
    }
}

/// Job and network-entry paths for a call at
/// `<jobs>.<job>.networks.<network>.static_ips`.
fn locate(here: &Cursor) -> Result<(Cursor, Cursor), OpError> {
    if here.depth() < 5 || here.component(-3) != "networks" {
        return Err(OpError::new(
            "(( static_ips )) must be used at <jobs>.<job>.networks.<network>.static_ips",
        ));
    }
    let parts = here.components();
    let job_path = Cursor::from_components(parts[..parts.len() - 3].to_vec());
    let entry_path = Cursor::from_components(parts[..parts.len() - 1].to_vec());
    Ok((job_path, entry_path))
}

fn network_name(entry: &Node, here: &Cursor) -> String {
    entry
        .get("name")
        .and_then(Node::scalar_string)
        .unwrap_or_else(|| here.component(-2).to_string())
}

fn network_path(name: &str) -> Cursor {
    Cursor::from_components(vec!["networks".to_string(), name.to_string()])
}

fn offset_of(value: &Node) -> Result<usize, OpError> {
    value
        .as_i64()
        .and_then(|i| usize::try_from(i).ok())
        .ok_or_else(|| OpError("static_ips offsets must be non-negative integers".to_string()))
}

impl Operator for StaticIps {
    fn phase(&self) -> Phase {
        Phase::Eval
    }

    /// The job's instance count and the network's definition, on top of
    /// the argument references.
    fn dependencies(&self, here: &Cursor, tree: &Node, _args: &[Arg], mut auto: Vec<Cursor>) -> Vec<Cursor> {
        let Ok((job_path, entry_path)) = locate(here) else {
            return auto;
        };
        auto.push(job_path.child("instances"));

        let network = match entry_path.resolve(tree) {
            Ok(entry) => {
                let path = network_path(&network_name(entry, here));
                path.canonical(tree).unwrap_or(path)
            }
            Err(_) => Cursor::from_components(vec!["networks".to_string()]),
        };
        auto.push(network);
        auto
    }

    fn run(&self, ctx: &mut OpContext<'_>, args: &[Arg]) -> Result<Response, OpError> {
        let here = ctx.here;
        let (job_path, entry_path) = locate(here)?;
        let job = job_path.resolve(ctx.tree)?;
        let entry = entry_path.resolve(ctx.tree)?;

        let job_name = job.name_of().unwrap_or_else(|| here.component(-4).to_string());
        let network_name = network_name(entry, here);

        let instances = job
            .get("instances")
            .and_then(Node::as_i64)
            .and_then(|i| usize::try_from(i).ok())
            .ok_or_else(|| OpError(format!("job `{}` has no valid instance count", job_name)))?;

        let network = network_path(&network_name)
            .resolve(ctx.tree)
            .map_err(|_| {
                OpError(format!("network `{}` is not defined in the top-level networks", network_name))
            })?;
        let pool = Pool::from_network(network, &network_name)?;

        let offsets = args
            .iter()
            .map(|arg| ctx.resolve(arg).and_then(|v| offset_of(&v)))
            .collect::<Result<Vec<usize>, OpError>>()?;
        if offsets.len() < instances {
            return Err(OpError(format!(
                "job `{}` has {} instances but only {} static IP offsets were given",
                job_name,
                instances,
                offsets.len()
            )));
        }

        let mut addresses = Vec::with_capacity(instances);
        for (index, offset) in offsets.into_iter().take(instances).enumerate() {
            let address = pool.get(offset).ok_or_else(|| {
                OpError(format!(
                    "request for static_ip({}) in job `{}` on network `{}` is out of range (pool has {} addresses)",
                    offset,
                    job_name,
                    network_name,
                    pool.len()
                ))
            })?;
            let owner = format!("{}/{}", job_name, index);
            ctx.run
                .claim_address(&network_name, address, &owner)
                .map_err(|holder| {
                    OpError(format!(
                        "address {} on network `{}` is already allocated to {}",
                        address, network_name, holder
                    ))
                })?;
            addresses.push(Node::string(address.to_string()));
        }

        Ok(Response::Replace(Node::Sequence(addresses)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunContext;
    use crate::node;
    use crate::operators::testing::{call, replaced};

    fn manifest(instances: i64) -> Node {
        node!({
            "networks" => [{
                "name" => "default",
                "subnets" => [
                    { "static" => ["10.0.0.5 - 10.0.0.7"] },
                    { "static" => "10.0.1.1" }
                ]
            }],
            "jobs" => [
                { "name" => "web", "instances" => instances, "networks" => [{ "name" => "default" }] },
                { "name" => "db", "instances" => 1, "networks" => [{ "name" => "default" }] }
            ]
        })
    }

    #[test]
    fn test_range_parse() {
        let range = Range::parse("10.0.0.254 - 10.0.1.1").unwrap();
        assert_eq!(range.len(), 4);
        assert_eq!(Range::parse("10.0.0.9").unwrap().len(), 1);
        assert!(Range::parse("10.0.0.5 - 10.0.0.1").is_err());
        assert!(Range::parse("nope").is_err());
    }

    #[test]
    fn test_pool_indexes_across_ranges() {
        let pool = Pool {
            ranges: vec![
                Range::parse("10.0.0.254 - 10.0.1.1").unwrap(),
                Range::parse("10.0.2.7").unwrap(),
            ],
        };
        assert_eq!(pool.len(), 5);
        assert_eq!(pool.get(2), Some(Ipv4Addr::new(10, 0, 1, 0)));
        assert_eq!(pool.get(4), Some(Ipv4Addr::new(10, 0, 2, 7)));
        assert_eq!(pool.get(5), None);
    }

    #[test]
    fn test_whole_address_space_is_not_expanded() {
        let pool = Pool {
            ranges: vec![Range::parse("0.0.0.0 - 255.255.255.255").unwrap()],
        };
        assert_eq!(pool.len(), 1 << 32);
        assert_eq!(pool.get(usize::MAX), None);
        assert_eq!(pool.get(0x0a00_0001), Some(Ipv4Addr::new(10, 0, 0, 1)));
    }

    #[test]
    fn test_dependencies_cover_instances_and_network() {
        let tree = manifest(1);
        let here = Cursor::parse("jobs.0.networks.0.static_ips").unwrap();
        let deps = StaticIps.dependencies(&here, &tree, &[], Vec::new());
        let deps: Vec<String> = deps.iter().map(Cursor::qualified).collect();
        assert_eq!(deps, vec!["$.jobs.0.instances", "$.networks.0"]);
    }

    #[test]
    fn test_allocates_per_instance() {
        let tree = manifest(2);
        let mut run = RunContext::new();
        let result = call(&StaticIps, &tree, "jobs.0.networks.0.static_ips", "0 3 1", &mut run);
        assert_eq!(replaced(result), node!(["10.0.0.5", "10.0.1.1"]));
        assert_eq!(run.used_address_count(), 2);
    }

    #[test]
    fn test_double_allocation_rejected() {
        let tree = manifest(1);
        let mut run = RunContext::new();
        call(&StaticIps, &tree, "jobs.0.networks.0.static_ips", "2", &mut run).unwrap();
        let err = call(&StaticIps, &tree, "jobs.1.networks.0.static_ips", "2", &mut run).unwrap_err();
        assert_eq!(
            err.to_string(),
            "address 10.0.0.7 on network `default` is already allocated to web/0"
        );

        run.reset();
        assert!(call(&StaticIps, &tree, "jobs.1.networks.0.static_ips", "2", &mut run).is_ok());
    }

    #[test]
    fn test_not_enough_offsets() {
        let tree = manifest(3);
        let err = call(&StaticIps, &tree, "jobs.0.networks.0.static_ips", "0 1", &mut RunContext::new())
            .unwrap_err();
        assert!(err.to_string().contains("has 3 instances but only 2"));
    }

    #[test]
    fn test_offset_out_of_pool() {
        let tree = manifest(1);
        let err = call(&StaticIps, &tree, "jobs.0.networks.0.static_ips", "9", &mut RunContext::new())
            .unwrap_err();
        assert!(err.to_string().contains("out of range (pool has 4 addresses)"));
    }

    #[test]
    fn test_wrong_location() {
        let tree = manifest(1);
        assert!(call(&StaticIps, &tree, "jobs.0.static_ips", "0", &mut RunContext::new()).is_err());
    }
}
