/*!

This is the long-form manual for `election_ledger` and `elector`.

## Rules

* Candidates are registered with an identifier and a name. Both are chosen by
  the caller and both are required. An identifier can only be registered once.
* Every voter, identified by a voter id, votes at most once. A voter who tries
  to vote a second time is refused, even if the second vote is for an unknown
  candidate.
* A vote for a candidate that is not registered is refused, and the voter may
  try again.
* The results list all the candidates by decreasing number of votes. Candidates
  with the same number of votes are listed in registration order.
* The winners are the candidates with the most votes. There is no winner as long
  as nobody received a vote. When several candidates share the top spot, they
  are all reported as winners: ties are not broken.
* A reset removes all the candidates, all the votes and all the voters.
  Everybody can vote again afterwards.

## Command line

`elector` keeps the election in a JSON state file (`election.json` by default)
and runs one command per invocation:

```bash
elector add 1 Alice
elector add 2 Bob Smith
elector vote 100 1
elector results
elector list-candidates
elector list-votes
elector reset
```

Every command prints a JSON document on the standard output:

```text
{"candidate":{"id":"1","name":"Alice","voteCount":1},"msg":"vote_casted","ok":true}
{"error":"Voter 100 has already voted","msg":"already_voted","ok":false}
```

The codes for refused operations are `missing_field`, `candidate_exists`,
`candidate_not_found`, `already_voted` and `no_candidates`. A refused operation
still exits with status 0. Problems with the files (unreadable state, invalid
JSON, corrupted state) exit with a non-zero status.

### `import`

Loads candidates and votes from CSV files without headers:

```text
1,Alice
2,Bob
```

```text
100,1
101,2
```

The first file lists `id,name` pairs, the second `voterId,candidateId` pairs.
A name runs to the end of the line and may contain commas. Blank lines are
ignored.
The rows are applied in order, through the same rules as the `add` and `vote`
commands. If any row is refused, nothing is imported.

### `--reference`

With `results`, compares the output with a reference JSON file and prints the
differences. The command fails if they differ.

## Configuration

An optional JSON configuration file can be passed with `--config`:

```text
{
  "contestName": "Student council",
  "statePath": "council.json",
  "candidates": [
    { "id": "1", "name": "Alice" },
    { "id": "2", "name": "Bob" }
  ]
}
```

- `statePath` (optional): the state file. The `--state` flag takes precedence.
- `candidates` (optional): candidates registered automatically when the state
  is empty, for example right after a reset.
- `contestName` (optional): reported in the output of `results`.

## State file

The state file stores the candidates and the votes, and a SHA-256 fingerprint of
both. Vote counts are not stored: they are recomputed from the votes when the
file is read. A file whose fingerprint does not match its contents is refused.

Each run locks a `.lock` file next to the state file (`election.json.lock` by
default) until its command is applied, so several `elector` processes can
share one state file: a voter still votes only once.

Set `RUST_LOG=debug` or pass `--verbose` to see the details of each operation.

 */
